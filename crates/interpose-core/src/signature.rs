//! Signature descriptors and the resolved signature set

use crate::error::{Error, Result};
use crate::role::{Method, Role, RoleSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One declared interest: a method on a role, identified by name and
/// parameter types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub role: String,
    pub method: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Signature {
    pub fn new<I, S>(role: Role, method: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role: role.as_str().to_string(),
            method: method.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Descriptor for a method already known to exist.
    pub fn of(method: Method) -> Self {
        Self::new(method.role(), method.name(), method.params().iter().copied())
    }

    fn resolve(&self) -> Result<Method> {
        let role: Role = self.role.parse().map_err(Error::Configuration)?;
        role.resolve(&self.method, self.args.as_slice()).ok_or_else(|| {
            Error::configuration(format!(
                "could not find method on {} named {} with args ({})",
                role,
                self.method,
                self.args.join(", ")
            ))
        })
    }
}

/// Resolved role → method mapping an observer intercepts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignatureSet {
    methods: HashMap<Role, BTreeSet<Method>>,
}

impl SignatureSet {
    /// Resolve every descriptor. An observer that declares nothing is
    /// misconfigured, as is any descriptor that names no existing method.
    pub fn build(observer: &str, signatures: &[Signature]) -> Result<Self> {
        if signatures.is_empty() {
            return Err(Error::configuration(format!(
                "no signatures were declared by observer {}",
                observer
            )));
        }
        let mut methods: HashMap<Role, BTreeSet<Method>> = HashMap::new();
        for sig in signatures {
            let method = sig.resolve().map_err(|e| match e {
                Error::Configuration(msg) => {
                    Error::configuration(format!("observer {}: {}", observer, msg))
                }
                other => other,
            })?;
            methods.entry(method.role()).or_default().insert(method);
        }
        Ok(Self { methods })
    }

    pub fn contains(&self, method: Method) -> bool {
        self.methods
            .get(&method.role())
            .is_some_and(|set| set.contains(&method))
    }

    pub fn roles(&self) -> RoleSet {
        self.methods.keys().copied().collect()
    }

    pub fn methods(&self, role: Role) -> impl Iterator<Item = Method> + '_ {
        self.methods.get(&role).into_iter().flatten().copied()
    }

    /// Every method in the set, grouped by role.
    pub fn iter(&self) -> impl Iterator<Item = Method> + '_ {
        Role::ALL.into_iter().flat_map(|role| self.methods(role))
    }

    /// Total number of distinct methods.
    pub fn len(&self) -> usize {
        self.methods.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_descriptors_collapse() {
        let sigs = vec![
            Signature::of(Method::ExecutorQuery),
            Signature::of(Method::ExecutorQuery),
        ];
        let set = SignatureSet::build("dup", &sigs).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn unknown_role_is_configuration_error() {
        let sig = Signature {
            role: "Connection".into(),
            method: "close".into(),
            args: vec![],
        };
        let err = SignatureSet::build("bad", &[sig]).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("unknown role: Connection"));
        assert!(err.to_string().contains("observer bad"));
    }
}
