//! Observer registry
//!
//! Maps plugin names used in configuration files to observer constructors.
//! Builtins are registered by `create_default_registry()` in lib.rs.

use interpose_core::{Error, Observer, Result};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// String properties handed to an observer constructor.
pub type Properties = HashMap<String, String>;

pub type ObserverFactory = Box<dyn Fn(&Properties) -> Result<Arc<dyn Observer>> + Send + Sync>;

pub struct ObserverRegistry {
    factories: HashMap<String, ObserverFactory>,
}

impl Default for ObserverRegistry {
    fn default() -> Self { Self::new() }
}

impl ObserverRegistry {
    pub fn new() -> Self { Self { factories: HashMap::new() } }

    /// Register a constructor. Replaces any existing one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Properties) -> Result<Arc<dyn Observer>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build a fresh observer. Unknown names are configuration errors.
    pub fn create(&self, name: &str, properties: &Properties) -> Result<Arc<dyn Observer>> {
        match self.factories.get(name) {
            Some(factory) => factory(properties),
            None => Err(Error::configuration(format!("unknown plugin: {}", name))),
        }
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Read an optional typed property, falling back to `default`.
pub fn property<T: FromStr>(properties: &Properties, key: &str, default: T) -> Result<T> {
    match properties.get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            Error::configuration(format!("invalid value for property {}: {:?}", key, raw))
        }),
        None => Ok(default),
    }
}

/// Read a property that must be present.
pub fn required_property<'a>(properties: &'a Properties, key: &str) -> Result<&'a str> {
    properties
        .get(key)
        .map(|s| s.as_str())
        .ok_or_else(|| Error::configuration(format!("missing required property: {}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_parsing() {
        let mut props = Properties::new();
        props.insert("max_rows".into(), " 50 ".into());
        props.insert("broken".into(), "many".into());
        assert_eq!(property(&props, "max_rows", 10usize).unwrap(), 50);
        assert_eq!(property(&props, "absent", 10usize).unwrap(), 10);
        assert!(property(&props, "broken", 10usize).unwrap_err().is_configuration());
        assert!(required_property(&props, "absent").is_err());
    }
}
