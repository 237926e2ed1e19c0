//! Executor scripts for the `interpose run` command
//!
//! A script seeds tables and lists executor calls. Each call's outcome is
//! recorded; a failing call does not stop the script.

use interpose_core::{Executor, Result, RowBounds, Statement};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Script {
    /// Initial table contents.
    pub tables: HashMap<String, Vec<Value>>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Step {
    Update {
        statement: Statement,
        #[serde(default)]
        parameter: Value,
    },
    Query {
        statement: Statement,
        #[serde(default)]
        parameter: Value,
        #[serde(default)]
        bounds: Option<RowBounds>,
    },
    Commit {
        #[serde(default)]
        required: bool,
    },
    Rollback {
        #[serde(default)]
        required: bool,
    },
    Close,
}

impl Step {
    pub fn call(&self) -> &'static str {
        match self {
            Self::Update { .. } => "update",
            Self::Query { .. } => "query",
            Self::Commit { .. } => "commit",
            Self::Rollback { .. } => "rollback",
            Self::Close => "close",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub call: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Run every step against `executor`, in order.
    pub fn run(&self, executor: &dyn Executor) -> Vec<StepOutcome> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let outcome = run_step(executor, step);
                StepOutcome {
                    step: i + 1,
                    call: step.call(),
                    error: outcome.as_ref().err().map(|e| e.to_string()),
                    result: outcome.ok(),
                }
            })
            .collect()
    }
}

fn run_step(executor: &dyn Executor, step: &Step) -> Result<Value> {
    match step {
        Step::Update {
            statement,
            parameter,
        } => Ok(Value::from(executor.update(statement, parameter)?)),
        Step::Query {
            statement,
            parameter,
            bounds: Some(bounds),
        } => Ok(Value::Array(executor.query_with_bounds(
            statement, parameter, *bounds,
        )?)),
        Step::Query {
            statement,
            parameter,
            bounds: None,
        } => Ok(Value::Array(executor.query(statement, parameter)?)),
        Step::Commit { required } => executor.commit(*required).map(|_| Value::Null),
        Step::Rollback { required } => executor.rollback(*required).map(|_| Value::Null),
        Step::Close => executor.close().map(|_| Value::Null),
    }
}
