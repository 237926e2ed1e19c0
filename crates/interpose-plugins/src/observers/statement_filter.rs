//! Statement filter - rejects executor calls whose statement id matches a
//! deny pattern

use crate::registry::{required_property, Properties};
use interpose_core::{Error, Invocation, Method, Observer, Result, Signature, Statement};
use regex::Regex;
use serde_json::Value;
use tracing::info;

pub struct StatementFilterObserver {
    deny: Regex,
}

impl StatementFilterObserver {
    pub fn new(deny: Regex) -> Self {
        Self { deny }
    }

    /// Properties: `deny` (required regex over statement ids).
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let pattern = required_property(properties, "deny")?;
        let deny = Regex::new(pattern).map_err(|e| {
            Error::configuration(format!("invalid deny pattern {:?}: {}", pattern, e))
        })?;
        Ok(Self::new(deny))
    }
}

impl Observer for StatementFilterObserver {
    fn name(&self) -> &str {
        "statement-filter"
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![
            Signature::of(Method::ExecutorQuery),
            Signature::of(Method::ExecutorQueryWithBounds),
            Signature::of(Method::ExecutorUpdate),
        ]
    }

    fn intercept(&self, invocation: &Invocation<'_>) -> Result<Value> {
        let statement: Statement = invocation.decode_arg(0)?;
        if self.deny.is_match(&statement.id) {
            info!(statement = %statement.id, "statement denied");
            return Err(Error::rejected(
                self.name(),
                invocation.method(),
                format!("statement {} is denied", statement.id),
            ));
        }
        invocation.proceed()
    }
}
