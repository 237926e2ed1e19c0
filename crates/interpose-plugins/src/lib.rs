//! interpose plugins - builtin observers and config-driven chain assembly
//!
//! Each observer is a self-contained file in src/observers/.
//! To add an observer: create the file, implement Observer, register below.

pub mod config;
pub mod observers;
pub mod registry;

pub use config::{PluginEntry, PluginsConfig};
pub use observers::read_only::ReadOnlyObserver;
pub use observers::row_limit::RowLimitObserver;
pub use observers::statement_filter::StatementFilterObserver;
pub use observers::timing::{CallStats, TimingObserver};
pub use registry::{ObserverFactory, ObserverRegistry, Properties};

use interpose_core::{
    Binding, Error, Invocation, Observer, ObserverChain, Result, Signature, SignatureSet, Target,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Create the registry with all builtin observers.
///
/// Edit this function to add or remove builtins.
pub fn create_default_registry() -> ObserverRegistry {
    let mut registry = ObserverRegistry::new();

    registry.register("timing", |props: &Properties| {
        Ok(Arc::new(TimingObserver::from_properties(props)?) as Arc<dyn Observer>)
    });
    registry.register("read-only", |props: &Properties| {
        Ok(Arc::new(ReadOnlyObserver::from_properties(props)?) as Arc<dyn Observer>)
    });
    registry.register("statement-filter", |props: &Properties| {
        Ok(Arc::new(StatementFilterObserver::from_properties(props)?) as Arc<dyn Observer>)
    });
    registry.register("row-limit", |props: &Properties| {
        Ok(Arc::new(RowLimitObserver::from_properties(props)?) as Arc<dyn Observer>)
    });

    registry
}

/// Build the observer chain described by `config`, in file order.
///
/// Any unknown plugin name, bad property or unresolvable signature fails the
/// whole build.
pub fn build_chain(config: &PluginsConfig, registry: &ObserverRegistry) -> Result<ObserverChain> {
    let mut chain = ObserverChain::new();
    for entry in &config.plugins {
        if !entry.enabled {
            debug!(plugin = %entry.name, "plugin disabled, skipping");
            continue;
        }
        let observer = registry.create(&entry.name, &entry.properties)?;
        let observer = match &entry.signatures {
            Some(signatures) => {
                check_override(observer.as_ref(), signatures)?;
                Arc::new(Declared {
                    inner: observer,
                    signatures: signatures.clone(),
                }) as Arc<dyn Observer>
            }
            None => observer,
        };
        chain.append(Binding::from_arc(observer)?);
    }
    info!(observers = chain.len(), "observer chain built");
    Ok(chain)
}

/// Load a config file and build its chain with the builtin registry.
pub fn load_chain(path: &Path) -> Result<ObserverChain> {
    let config = PluginsConfig::load(path)?;
    build_chain(&config, &create_default_registry())
}

/// A signature override may only narrow what the observer declares itself;
/// builtins decode their arguments for those methods and no others.
fn check_override(observer: &dyn Observer, signatures: &[Signature]) -> Result<()> {
    let own = SignatureSet::build(observer.name(), &observer.signatures())?;
    let requested = SignatureSet::build(observer.name(), signatures)?;
    if let Some(method) = requested.iter().find(|m| !own.contains(*m)) {
        return Err(Error::configuration(format!(
            "observer {}: signature override names {}, which it does not handle",
            observer.name(),
            method
        )));
    }
    Ok(())
}

/// An observer whose signatures come from configuration instead of its own
/// declaration.
struct Declared {
    inner: Arc<dyn Observer>,
    signatures: Vec<Signature>,
}

impl Observer for Declared {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn signatures(&self) -> Vec<Signature> {
        self.signatures.clone()
    }

    fn intercept(&self, invocation: &Invocation<'_>) -> Result<Value> {
        self.inner.intercept(invocation)
    }

    fn plugin(&self, target: Target, binding: &Binding) -> Target {
        self.inner.plugin(target, binding)
    }
}
