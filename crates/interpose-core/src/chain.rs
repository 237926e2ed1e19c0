//! Observer chain
//!
//! Observers are applied in registration order, so the last one registered
//! ends up as the outermost layer and sees each call first.

use crate::error::Result;
use crate::observer::{Binding, Observer};
use crate::target::Target;
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Default, Debug)]
pub struct ObserverChain {
    observers: Vec<Binding>,
}

impl ObserverChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bound observer to the end of the chain. The same observer may
    /// be appended more than once; each copy adds its own layer.
    pub fn append(&mut self, binding: Binding) {
        info!(
            observer = binding.name(),
            position = self.observers.len(),
            methods = binding.signatures().len(),
            "observer registered"
        );
        self.observers.push(binding);
    }

    /// Bind and append in one step.
    pub fn register(&mut self, observer: impl Observer + 'static) -> Result<()> {
        self.append(Binding::new(observer)?);
        Ok(())
    }

    /// Run every observer's wrapping step over `target`, in order.
    pub fn apply_all(&self, target: Target) -> Target {
        self.observers
            .iter()
            .fold(target, |current, binding| binding.apply(current))
    }

    pub fn list(&self) -> &[Binding] {
        &self.observers
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Freeze the chain for sharing with the subsystems that create core
    /// objects.
    pub fn freeze(self) -> Arc<Self> {
        Arc::new(self)
    }
}
