//! Row limit - caps how many rows a query may return
//!
//! Bounded queries proceed with the limit clamped. Unbounded queries are
//! redirected to the bounded overload on the same target.

use crate::registry::{property, Properties};
use interpose_core::{
    Error, Invocation, Method, Observer, Result, Role, RowBounds, Signature, Statement,
};
use serde_json::Value;
use tracing::debug;

pub struct RowLimitObserver {
    max_rows: usize,
}

impl RowLimitObserver {
    pub const DEFAULT_MAX_ROWS: usize = 1000;

    pub fn new(max_rows: usize) -> Self {
        Self { max_rows }
    }

    /// Properties: `max_rows` (default 1000).
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let max_rows = property(properties, "max_rows", Self::DEFAULT_MAX_ROWS)?;
        if max_rows == 0 {
            return Err(Error::configuration("max_rows must be positive"));
        }
        Ok(Self::new(max_rows))
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }
}

impl Observer for RowLimitObserver {
    fn name(&self) -> &str {
        "row-limit"
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![
            Signature::of(Method::ExecutorQuery),
            Signature::of(Method::ExecutorQueryWithBounds),
        ]
    }

    fn intercept(&self, invocation: &Invocation<'_>) -> Result<Value> {
        match invocation.method() {
            Method::ExecutorQueryWithBounds => {
                let bounds: RowBounds = invocation.decode_arg(2)?;
                if bounds.limit <= self.max_rows {
                    return invocation.proceed();
                }
                debug!(requested = bounds.limit, max = self.max_rows, "clamping row limit");
                let clamped = RowBounds::new(bounds.offset, self.max_rows);
                let mut args = invocation.args().to_vec();
                args[2] = serde_json::to_value(clamped)?;
                invocation.proceed_with(args)
            }
            Method::ExecutorQuery => {
                let statement: Statement = invocation.decode_arg(0)?;
                let parameter = invocation.arg(1).cloned().unwrap_or(Value::Null);
                let executor = invocation
                    .target()
                    .as_executor()
                    .ok_or(Error::RoleNotImplemented {
                        role: Role::Executor,
                    })?;
                let rows = executor.query_with_bounds(
                    &statement,
                    &parameter,
                    RowBounds::new(0, self.max_rows),
                )?;
                Ok(Value::Array(rows))
            }
            _ => invocation.proceed(),
        }
    }
}
