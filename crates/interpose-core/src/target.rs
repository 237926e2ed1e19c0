//! Core object contracts
//!
//! One trait per [`Role`]. A core object implements [`CoreObject`] and hands
//! out a view for each role it offers; everything that holds a core object
//! holds a [`Target`].

use crate::error::Result;
use crate::role::{Role, RoleSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Shared handle to a core object, wrapped or not.
pub type Target = Arc<dyn CoreObject>;

/// Kind of a mapped statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

/// A mapped statement: what to run, against which table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub id: String,
    pub kind: StatementKind,
    pub table: String,
    /// Projected columns for selects; empty selects every field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

impl Statement {
    pub fn new(id: impl Into<String>, kind: StatementKind, table: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            table: table.into(),
            columns: Vec::new(),
        }
    }

    pub fn select(id: impl Into<String>, table: impl Into<String>) -> Self {
        Self::new(id, StatementKind::Select, table)
    }

    pub fn insert(id: impl Into<String>, table: impl Into<String>) -> Self {
        Self::new(id, StatementKind::Insert, table)
    }

    pub fn update(id: impl Into<String>, table: impl Into<String>) -> Self {
        Self::new(id, StatementKind::Update, table)
    }

    pub fn delete(id: impl Into<String>, table: impl Into<String>) -> Self {
        Self::new(id, StatementKind::Delete, table)
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Render as SQL text, for logging and `StatementHandler::prepare`.
    pub fn sql(&self) -> String {
        match self.kind {
            StatementKind::Select if self.columns.is_empty() => {
                format!("SELECT * FROM {}", self.table)
            }
            StatementKind::Select => {
                format!("SELECT {} FROM {}", self.columns.join(", "), self.table)
            }
            StatementKind::Insert => format!("INSERT INTO {}", self.table),
            StatementKind::Update => format!("UPDATE {}", self.table),
            StatementKind::Delete => format!("DELETE FROM {}", self.table),
        }
    }
}

/// Offset/limit window applied to query results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowBounds {
    pub offset: usize,
    pub limit: usize,
}

impl RowBounds {
    pub const NO_ROW_LIMIT: usize = usize::MAX;

    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    pub fn apply(&self, rows: Vec<Value>) -> Vec<Value> {
        rows.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

impl Default for RowBounds {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: Self::NO_ROW_LIMIT,
        }
    }
}

/// Runs mapped statements and owns the transaction.
pub trait Executor: Send + Sync {
    fn update(&self, statement: &Statement, parameter: &Value) -> Result<u64>;

    fn query(&self, statement: &Statement, parameter: &Value) -> Result<Vec<Value>>;

    /// `query` overload taking an explicit row window.
    fn query_with_bounds(
        &self,
        statement: &Statement,
        parameter: &Value,
        bounds: RowBounds,
    ) -> Result<Vec<Value>>;

    fn commit(&self, required: bool) -> Result<()>;

    fn rollback(&self, required: bool) -> Result<()>;

    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> Result<bool>;
}

/// Prepares and runs one statement.
pub trait StatementHandler: Send + Sync {
    fn prepare(&self) -> Result<String>;

    fn parameterize(&self) -> Result<Vec<Value>>;

    fn update(&self) -> Result<u64>;

    fn query(&self, bounds: RowBounds) -> Result<Vec<Value>>;
}

/// Binds the parameter object of one statement.
pub trait ParameterHandler: Send + Sync {
    fn parameter_object(&self) -> Result<Value>;

    fn set_parameters(&self) -> Result<Vec<Value>>;
}

/// Maps raw rows into results.
pub trait ResultSetHandler: Send + Sync {
    fn handle_result_sets(&self, rows: Vec<Value>) -> Result<Vec<Value>>;
}

/// A core object: anything that offers one or more role views.
///
/// Implementors override the `as_*` accessor for each role they implement.
/// The role set is derived from those accessors, so it always agrees with
/// what a caller can actually reach.
pub trait CoreObject: Send + Sync {
    fn as_executor(&self) -> Option<&dyn Executor> {
        None
    }

    fn as_statement_handler(&self) -> Option<&dyn StatementHandler> {
        None
    }

    fn as_parameter_handler(&self) -> Option<&dyn ParameterHandler> {
        None
    }

    fn as_result_set_handler(&self) -> Option<&dyn ResultSetHandler> {
        None
    }

    fn implements(&self, role: Role) -> bool {
        match role {
            Role::Executor => self.as_executor().is_some(),
            Role::StatementHandler => self.as_statement_handler().is_some(),
            Role::ParameterHandler => self.as_parameter_handler().is_some(),
            Role::ResultSetHandler => self.as_result_set_handler().is_some(),
        }
    }

    /// All roles this object offers.
    fn roles(&self) -> RoleSet {
        Role::ALL.into_iter().filter(|r| self.implements(*r)).collect()
    }
}
