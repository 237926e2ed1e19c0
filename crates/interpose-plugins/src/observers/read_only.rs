//! Read-only observer - refuses every executor write

use crate::registry::Properties;
use interpose_core::{Error, Invocation, Method, Observer, Result, Signature};
use serde_json::Value;
use tracing::debug;

pub struct ReadOnlyObserver {
    reason: String,
}

impl ReadOnlyObserver {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Properties: `reason` (default "read-only mode").
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let reason = properties
            .get("reason")
            .cloned()
            .unwrap_or_else(|| "read-only mode".to_string());
        Ok(Self::new(reason))
    }
}

impl Observer for ReadOnlyObserver {
    fn name(&self) -> &str {
        "read-only"
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![Signature::of(Method::ExecutorUpdate)]
    }

    fn intercept(&self, invocation: &Invocation<'_>) -> Result<Value> {
        debug!(method = %invocation.method(), "write refused");
        Err(Error::rejected(
            self.name(),
            invocation.method(),
            self.reason.clone(),
        ))
    }
}
