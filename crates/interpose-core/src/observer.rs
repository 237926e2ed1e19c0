//! The Observer trait and its registration binding
//!
//! An observer declares the methods it wants to see and receives an
//! [`Invocation`] for each matching call. To add one: implement the trait,
//! then register it with an [`ObserverChain`](crate::ObserverChain).

use crate::error::Result;
use crate::invocation::Invocation;
use crate::plugin;
use crate::signature::{Signature, SignatureSet};
use crate::target::Target;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub trait Observer: Send + Sync {
    /// Unique observer name (e.g. "timing", "read-only").
    fn name(&self) -> &str;

    /// Methods this observer intercepts. Must not be empty.
    fn signatures(&self) -> Vec<Signature>;

    /// Handle one intercepted call. Call `invocation.proceed()` to reach the
    /// real method, or return without it to short-circuit.
    fn intercept(&self, invocation: &Invocation<'_>) -> Result<Value>;

    /// Wrapping step the chain runs for every new core object. Default: the
    /// standard forwarding wrapper. Override to skip targets or wrap them
    /// differently.
    fn plugin(&self, target: Target, binding: &Binding) -> Target {
        binding.wrap(target)
    }
}

/// An observer together with its resolved, cached signature set.
#[derive(Clone)]
pub struct Binding {
    observer: Arc<dyn Observer>,
    signatures: Arc<SignatureSet>,
}

impl Binding {
    pub fn new(observer: impl Observer + 'static) -> Result<Self> {
        Self::from_arc(Arc::new(observer))
    }

    /// Resolve the observer's signatures. Fails with a configuration error
    /// when they are missing or name an unknown method.
    pub fn from_arc(observer: Arc<dyn Observer>) -> Result<Self> {
        let signatures = SignatureSet::build(observer.name(), &observer.signatures())?;
        Ok(Self {
            observer,
            signatures: Arc::new(signatures),
        })
    }

    pub fn name(&self) -> &str {
        self.observer.name()
    }

    pub fn observer(&self) -> &Arc<dyn Observer> {
        &self.observer
    }

    pub fn signatures(&self) -> &SignatureSet {
        &self.signatures
    }

    /// Standard forwarding wrapper around `target`, or `target` itself if it
    /// offers none of the declared roles.
    pub fn wrap(&self, target: Target) -> Target {
        plugin::wrap(target, self)
    }

    /// Run the observer's own wrapping step.
    pub fn apply(&self, target: Target) -> Target {
        self.observer.plugin(target, self)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("observer", &self.name())
            .field("signatures", &self.signatures)
            .finish()
    }
}
