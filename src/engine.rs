//! In-memory reference engine
//!
//! One implementation of every role, backed by a table store kept in
//! memory. Handlers are created through [`Configuration`] so each one is run
//! through the observer chain.

use crate::session::Configuration;
use interpose_core::{
    CoreObject, Error, Executor, ParameterHandler, Result, ResultSetHandler, Role, RowBounds,
    Statement, StatementHandler, StatementKind, Target,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A stored row. `id` is internal and never shown to callers.
#[derive(Clone)]
struct Row {
    id: u64,
    value: Value,
}

#[derive(Default)]
struct Store {
    tables: HashMap<String, Vec<Row>>,
    next_id: u64,
}

impl Store {
    fn row(&mut self, value: Value) -> Row {
        self.next_id += 1;
        Row {
            id: self.next_id,
            value,
        }
    }
}

/// How to take back one write.
enum Undo {
    Insert { table: String, id: u64 },
    Update { table: String, before: Vec<Row> },
    Delete { table: String, removed: Vec<(usize, Row)> },
}

/// Uncommitted writes of one executor, oldest first.
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<Undo>>>,
}

impl Journal {
    fn lock(&self) -> Result<MutexGuard<'_, Vec<Undo>>> {
        self.entries
            .lock()
            .map_err(|_| Error::execution("journal lock poisoned"))
    }

    fn record(&self, undo: Undo) -> Result<()> {
        self.lock()?.push(undo);
        Ok(())
    }

    fn take(&self) -> Result<Vec<Undo>> {
        Ok(std::mem::take(&mut *self.lock()?))
    }
}

#[derive(Default)]
pub struct MemoryDatabase {
    store: Mutex<Store>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Value>) -> Self {
        let store = self
            .store
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        let rows = rows.into_iter().map(|value| store.row(value)).collect();
        store.tables.insert(name.into(), rows);
        self
    }

    /// Current rows of `table`; empty if the table does not exist.
    pub fn rows(&self, table: &str) -> Result<Vec<Value>> {
        Ok(self
            .lock()?
            .tables
            .get(table)
            .into_iter()
            .flatten()
            .map(|row| row.value.clone())
            .collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| Error::execution("database lock poisoned"))
    }

    fn select(&self, table: &str, filter: &Value) -> Result<Vec<Value>> {
        check_filter(filter)?;
        let store = self.lock()?;
        Ok(store
            .tables
            .get(table)
            .into_iter()
            .flatten()
            .filter(|row| matches(&row.value, filter))
            .map(|row| row.value.clone())
            .collect())
    }

    fn insert(&self, table: &str, value: &Value) -> Result<(u64, Undo)> {
        if !value.is_object() {
            return Err(Error::execution("insert parameter must be an object"));
        }
        let mut store = self.lock()?;
        let row = store.row(value.clone());
        let id = row.id;
        store.tables.entry(table.to_string()).or_default().push(row);
        let undo = Undo::Insert {
            table: table.to_string(),
            id,
        };
        Ok((1, undo))
    }

    fn update(&self, table: &str, parameter: &Value) -> Result<(u64, Undo)> {
        let filter = parameter.get("where").unwrap_or(&Value::Null);
        let set = parameter
            .get("set")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::execution("update parameter needs a \"set\" object"))?;
        check_filter(filter)?;
        let mut store = self.lock()?;
        let mut before = Vec::new();
        for row in store.tables.get_mut(table).into_iter().flatten() {
            if !matches(&row.value, filter) {
                continue;
            }
            let original = row.clone();
            if let Some(fields) = row.value.as_object_mut() {
                for (k, v) in set {
                    fields.insert(k.clone(), v.clone());
                }
                before.push(original);
            }
        }
        let changed = before.len() as u64;
        let undo = Undo::Update {
            table: table.to_string(),
            before,
        };
        Ok((changed, undo))
    }

    fn delete(&self, table: &str, filter: &Value) -> Result<(u64, Undo)> {
        check_filter(filter)?;
        let mut store = self.lock()?;
        let mut removed = Vec::new();
        if let Some(rows) = store.tables.get_mut(table) {
            let mut kept = Vec::with_capacity(rows.len());
            for (index, row) in rows.drain(..).enumerate() {
                if matches(&row.value, filter) {
                    removed.push((index, row));
                } else {
                    kept.push(row);
                }
            }
            *rows = kept;
        }
        let deleted = removed.len() as u64;
        let undo = Undo::Delete {
            table: table.to_string(),
            removed,
        };
        Ok((deleted, undo))
    }

    /// Take back `entries`, newest first. Rows written by others are left
    /// alone.
    fn undo(&self, entries: Vec<Undo>) -> Result<()> {
        let mut store = self.lock()?;
        for entry in entries.into_iter().rev() {
            match entry {
                Undo::Insert { table, id } => {
                    if let Some(rows) = store.tables.get_mut(&table) {
                        rows.retain(|row| row.id != id);
                    }
                }
                Undo::Update { table, before } => {
                    let Some(rows) = store.tables.get_mut(&table) else {
                        continue;
                    };
                    for original in before {
                        if let Some(row) = rows.iter_mut().find(|row| row.id == original.id) {
                            *row = original;
                        }
                    }
                }
                Undo::Delete { table, removed } => {
                    let rows = store.tables.entry(table).or_default();
                    for (index, row) in removed {
                        let at = index.min(rows.len());
                        rows.insert(at, row);
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_filter(filter: &Value) -> Result<()> {
    if filter.is_null() || filter.is_object() {
        Ok(())
    } else {
        Err(Error::execution("filter must be an object or null"))
    }
}

/// Equality filter: every field of `filter` must equal the row's field.
fn matches(row: &Value, filter: &Value) -> bool {
    match filter {
        Value::Object(fields) => fields.iter().all(|(k, v)| row.get(k) == Some(v)),
        _ => true,
    }
}

pub struct MemoryExecutor {
    configuration: Configuration,
    journal: Journal,
    closed: AtomicBool,
}

impl MemoryExecutor {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            journal: Journal::default(),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ExecutorClosed);
        }
        Ok(())
    }

    fn undo_pending(&self) -> Result<usize> {
        let pending = self.journal.take()?;
        let count = pending.len();
        if count > 0 {
            self.configuration.database().undo(pending)?;
        }
        Ok(count)
    }
}

fn statement_handler(target: &Target) -> Result<&dyn StatementHandler> {
    target
        .as_statement_handler()
        .ok_or(Error::RoleNotImplemented {
            role: Role::StatementHandler,
        })
}

impl Executor for MemoryExecutor {
    fn update(&self, statement: &Statement, parameter: &Value) -> Result<u64> {
        self.ensure_open()?;
        let handler = self
            .configuration
            .new_statement_handler(statement, parameter, &self.journal);
        let handler = statement_handler(&handler)?;
        let sql = handler.prepare()?;
        let bound = handler.parameterize()?;
        debug!(statement = %statement.id, %sql, params = bound.len(), "update");
        handler.update()
    }

    fn query(&self, statement: &Statement, parameter: &Value) -> Result<Vec<Value>> {
        self.query_with_bounds(statement, parameter, RowBounds::default())
    }

    fn query_with_bounds(
        &self,
        statement: &Statement,
        parameter: &Value,
        bounds: RowBounds,
    ) -> Result<Vec<Value>> {
        self.ensure_open()?;
        let handler = self
            .configuration
            .new_statement_handler(statement, parameter, &self.journal);
        let handler = statement_handler(&handler)?;
        let sql = handler.prepare()?;
        let bound = handler.parameterize()?;
        debug!(statement = %statement.id, %sql, params = bound.len(), "query");
        handler.query(bounds)
    }

    fn commit(&self, required: bool) -> Result<()> {
        self.ensure_open()?;
        let pending = self.journal.take()?.len();
        debug!(required, pending, "commit");
        Ok(())
    }

    fn rollback(&self, required: bool) -> Result<()> {
        self.ensure_open()?;
        let undone = self.undo_pending()?;
        if undone == 0 && required {
            debug!("rollback requested with no pending writes");
        } else {
            debug!(undone, "rollback");
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let undone = self.undo_pending()?;
        if undone > 0 {
            debug!(undone, "closed with pending writes, rolled back");
        }
        Ok(())
    }

    fn is_closed(&self) -> Result<bool> {
        Ok(self.closed.load(Ordering::SeqCst))
    }
}

impl CoreObject for MemoryExecutor {
    fn as_executor(&self) -> Option<&dyn Executor> {
        Some(self)
    }
}

pub struct MemoryStatementHandler {
    configuration: Configuration,
    statement: Statement,
    parameter: Value,
    parameter_handler: Target,
    result_set_handler: Target,
    journal: Journal,
}

impl MemoryStatementHandler {
    pub fn new(
        configuration: Configuration,
        statement: Statement,
        parameter: Value,
        parameter_handler: Target,
        result_set_handler: Target,
        journal: Journal,
    ) -> Self {
        Self {
            configuration,
            statement,
            parameter,
            parameter_handler,
            result_set_handler,
            journal,
        }
    }
}

impl StatementHandler for MemoryStatementHandler {
    fn prepare(&self) -> Result<String> {
        Ok(self.statement.sql())
    }

    fn parameterize(&self) -> Result<Vec<Value>> {
        self.parameter_handler
            .as_parameter_handler()
            .ok_or(Error::RoleNotImplemented {
                role: Role::ParameterHandler,
            })?
            .set_parameters()
    }

    fn update(&self) -> Result<u64> {
        let db = self.configuration.database();
        let table = &self.statement.table;
        let (count, undo) = match self.statement.kind {
            StatementKind::Insert => db.insert(table, &self.parameter)?,
            StatementKind::Update => db.update(table, &self.parameter)?,
            StatementKind::Delete => db.delete(table, &self.parameter)?,
            StatementKind::Select => {
                return Err(Error::execution(format!(
                    "{} is a select and cannot update",
                    self.statement.id
                )))
            }
        };
        self.journal.record(undo)?;
        Ok(count)
    }

    fn query(&self, bounds: RowBounds) -> Result<Vec<Value>> {
        if self.statement.kind != StatementKind::Select {
            return Err(Error::execution(format!(
                "{} is not a select",
                self.statement.id
            )));
        }
        let rows = self
            .configuration
            .database()
            .select(&self.statement.table, &self.parameter)?;
        let rows = self
            .result_set_handler
            .as_result_set_handler()
            .ok_or(Error::RoleNotImplemented {
                role: Role::ResultSetHandler,
            })?
            .handle_result_sets(rows)?;
        Ok(bounds.apply(rows))
    }
}

impl CoreObject for MemoryStatementHandler {
    fn as_statement_handler(&self) -> Option<&dyn StatementHandler> {
        Some(self)
    }
}

pub struct MemoryParameterHandler {
    statement: Statement,
    parameter: Value,
}

impl MemoryParameterHandler {
    pub fn new(statement: Statement, parameter: Value) -> Self {
        Self {
            statement,
            parameter,
        }
    }
}

impl ParameterHandler for MemoryParameterHandler {
    fn parameter_object(&self) -> Result<Value> {
        Ok(self.parameter.clone())
    }

    /// Positional values in field order; updates bind `where` then `set`.
    fn set_parameters(&self) -> Result<Vec<Value>> {
        fn values(v: &Value) -> Vec<Value> {
            match v {
                Value::Null => Vec::new(),
                Value::Object(fields) => fields.values().cloned().collect(),
                other => vec![other.clone()],
            }
        }
        Ok(match self.statement.kind {
            StatementKind::Update => {
                let mut bound = values(self.parameter.get("where").unwrap_or(&Value::Null));
                bound.extend(values(self.parameter.get("set").unwrap_or(&Value::Null)));
                bound
            }
            _ => values(&self.parameter),
        })
    }
}

impl CoreObject for MemoryParameterHandler {
    fn as_parameter_handler(&self) -> Option<&dyn ParameterHandler> {
        Some(self)
    }
}

pub struct MemoryResultSetHandler {
    statement: Statement,
}

impl MemoryResultSetHandler {
    pub fn new(statement: Statement) -> Self {
        Self { statement }
    }
}

impl ResultSetHandler for MemoryResultSetHandler {
    fn handle_result_sets(&self, rows: Vec<Value>) -> Result<Vec<Value>> {
        if self.statement.columns.is_empty() {
            return Ok(rows);
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                let projected: Map<String, Value> = self
                    .statement
                    .columns
                    .iter()
                    .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                    .collect();
                Value::Object(projected)
            })
            .collect())
    }
}

impl CoreObject for MemoryResultSetHandler {
    fn as_result_set_handler(&self) -> Option<&dyn ResultSetHandler> {
        Some(self)
    }
}
