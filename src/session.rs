//! Owning subsystem for core objects
//!
//! `Configuration` is the only place core objects are created. Every new
//! object goes through the frozen observer chain exactly once, and only the
//! returned handle is handed out.

use crate::engine::{
    Journal, MemoryDatabase, MemoryExecutor, MemoryParameterHandler, MemoryResultSetHandler,
    MemoryStatementHandler,
};
use interpose_core::{Error, Executor, ObserverChain, Result, Statement, Target};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct Configuration {
    chain: Arc<ObserverChain>,
    database: Arc<MemoryDatabase>,
}

impl Configuration {
    pub fn new(chain: Arc<ObserverChain>, database: Arc<MemoryDatabase>) -> Self {
        Self { chain, database }
    }

    pub fn chain(&self) -> &ObserverChain {
        &self.chain
    }

    pub fn database(&self) -> &MemoryDatabase {
        &self.database
    }

    pub fn new_executor(&self) -> Target {
        self.chain
            .apply_all(Arc::new(MemoryExecutor::new(self.clone())))
    }

    /// Writes made through the handler are recorded in `journal`, so the
    /// owning executor can take them back.
    pub fn new_statement_handler(
        &self,
        statement: &Statement,
        parameter: &Value,
        journal: &Journal,
    ) -> Target {
        let parameter_handler = self.new_parameter_handler(statement, parameter);
        let result_set_handler = self.new_result_set_handler(statement);
        self.chain.apply_all(Arc::new(MemoryStatementHandler::new(
            self.clone(),
            statement.clone(),
            parameter.clone(),
            parameter_handler,
            result_set_handler,
            journal.clone(),
        )))
    }

    pub fn new_parameter_handler(&self, statement: &Statement, parameter: &Value) -> Target {
        self.chain.apply_all(Arc::new(MemoryParameterHandler::new(
            statement.clone(),
            parameter.clone(),
        )))
    }

    pub fn new_result_set_handler(&self, statement: &Statement) -> Target {
        self.chain
            .apply_all(Arc::new(MemoryResultSetHandler::new(statement.clone())))
    }
}

/// Executor view of a handle from [`Configuration::new_executor`].
pub fn executor(target: &Target) -> Result<&dyn Executor> {
    target.as_executor().ok_or(Error::RoleNotImplemented {
        role: interpose_core::Role::Executor,
    })
}
