//! Forwarding wrapper
//!
//! A [`Plugin`] stands in for a target and offers exactly the roles the
//! target shares with the observer's signature set. Declared methods go to
//! the observer; every other call goes straight to the target.

use crate::error::Result;
use crate::invocation::{
    decode_return, encode_arg, executor, parameter_handler, result_set_handler,
    statement_handler, Invocation,
};
use crate::observer::Binding;
use crate::role::{Method, Role, RoleSet};
use crate::target::{
    CoreObject, Executor, ParameterHandler, ResultSetHandler, RowBounds, Statement,
    StatementHandler, Target,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

pub struct Plugin {
    target: Target,
    binding: Binding,
    roles: RoleSet,
}

/// Wrap `target` for `binding`'s observer.
///
/// Returns `target` unchanged (same allocation) when it offers none of the
/// roles the observer declared.
pub fn wrap(target: Target, binding: &Binding) -> Target {
    let declared = binding.signatures().roles();
    let roles: RoleSet = target.roles().intersection(&declared).copied().collect();
    if roles.is_empty() {
        trace!(observer = binding.name(), "no declared role on target, not wrapping");
        return target;
    }
    debug!(observer = binding.name(), ?roles, "wrapping target");
    Arc::new(Plugin {
        target,
        binding: binding.clone(),
        roles,
    })
}

impl Plugin {
    fn intercepts(&self, method: Method) -> bool {
        self.binding.signatures().contains(method)
    }

    fn dispatch<R: DeserializeOwned>(&self, method: Method, args: Vec<Value>) -> Result<R> {
        trace!(observer = self.binding.name(), %method, "intercepting");
        let invocation = Invocation::new(&self.target, method, args);
        let value = self.binding.observer().intercept(&invocation)?;
        decode_return(method, value)
    }

    fn offers(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

impl CoreObject for Plugin {
    fn as_executor(&self) -> Option<&dyn Executor> {
        self.offers(Role::Executor).then_some(self as &dyn Executor)
    }

    fn as_statement_handler(&self) -> Option<&dyn StatementHandler> {
        self.offers(Role::StatementHandler)
            .then_some(self as &dyn StatementHandler)
    }

    fn as_parameter_handler(&self) -> Option<&dyn ParameterHandler> {
        self.offers(Role::ParameterHandler)
            .then_some(self as &dyn ParameterHandler)
    }

    fn as_result_set_handler(&self) -> Option<&dyn ResultSetHandler> {
        self.offers(Role::ResultSetHandler)
            .then_some(self as &dyn ResultSetHandler)
    }
}

impl Executor for Plugin {
    fn update(&self, statement: &Statement, parameter: &Value) -> Result<u64> {
        let method = Method::ExecutorUpdate;
        if self.intercepts(method) {
            let args = vec![encode_arg(method, 0, statement)?, parameter.clone()];
            return self.dispatch(method, args);
        }
        executor(self.target.as_ref())?.update(statement, parameter)
    }

    fn query(&self, statement: &Statement, parameter: &Value) -> Result<Vec<Value>> {
        let method = Method::ExecutorQuery;
        if self.intercepts(method) {
            let args = vec![encode_arg(method, 0, statement)?, parameter.clone()];
            return self.dispatch(method, args);
        }
        executor(self.target.as_ref())?.query(statement, parameter)
    }

    fn query_with_bounds(
        &self,
        statement: &Statement,
        parameter: &Value,
        bounds: RowBounds,
    ) -> Result<Vec<Value>> {
        let method = Method::ExecutorQueryWithBounds;
        if self.intercepts(method) {
            let args = vec![
                encode_arg(method, 0, statement)?,
                parameter.clone(),
                encode_arg(method, 2, &bounds)?,
            ];
            return self.dispatch(method, args);
        }
        executor(self.target.as_ref())?.query_with_bounds(statement, parameter, bounds)
    }

    fn commit(&self, required: bool) -> Result<()> {
        if self.intercepts(Method::ExecutorCommit) {
            return self.dispatch(Method::ExecutorCommit, vec![Value::Bool(required)]);
        }
        executor(self.target.as_ref())?.commit(required)
    }

    fn rollback(&self, required: bool) -> Result<()> {
        if self.intercepts(Method::ExecutorRollback) {
            return self.dispatch(Method::ExecutorRollback, vec![Value::Bool(required)]);
        }
        executor(self.target.as_ref())?.rollback(required)
    }

    fn close(&self) -> Result<()> {
        if self.intercepts(Method::ExecutorClose) {
            return self.dispatch(Method::ExecutorClose, Vec::new());
        }
        executor(self.target.as_ref())?.close()
    }

    fn is_closed(&self) -> Result<bool> {
        if self.intercepts(Method::ExecutorIsClosed) {
            return self.dispatch(Method::ExecutorIsClosed, Vec::new());
        }
        executor(self.target.as_ref())?.is_closed()
    }
}

impl StatementHandler for Plugin {
    fn prepare(&self) -> Result<String> {
        if self.intercepts(Method::StatementPrepare) {
            return self.dispatch(Method::StatementPrepare, Vec::new());
        }
        statement_handler(self.target.as_ref())?.prepare()
    }

    fn parameterize(&self) -> Result<Vec<Value>> {
        if self.intercepts(Method::StatementParameterize) {
            return self.dispatch(Method::StatementParameterize, Vec::new());
        }
        statement_handler(self.target.as_ref())?.parameterize()
    }

    fn update(&self) -> Result<u64> {
        if self.intercepts(Method::StatementUpdate) {
            return self.dispatch(Method::StatementUpdate, Vec::new());
        }
        statement_handler(self.target.as_ref())?.update()
    }

    fn query(&self, bounds: RowBounds) -> Result<Vec<Value>> {
        let method = Method::StatementQuery;
        if self.intercepts(method) {
            return self.dispatch(method, vec![encode_arg(method, 0, &bounds)?]);
        }
        statement_handler(self.target.as_ref())?.query(bounds)
    }
}

impl ParameterHandler for Plugin {
    fn parameter_object(&self) -> Result<Value> {
        if self.intercepts(Method::ParameterGetObject) {
            return self.dispatch(Method::ParameterGetObject, Vec::new());
        }
        parameter_handler(self.target.as_ref())?.parameter_object()
    }

    fn set_parameters(&self) -> Result<Vec<Value>> {
        if self.intercepts(Method::ParameterSet) {
            return self.dispatch(Method::ParameterSet, Vec::new());
        }
        parameter_handler(self.target.as_ref())?.set_parameters()
    }
}

impl ResultSetHandler for Plugin {
    fn handle_result_sets(&self, rows: Vec<Value>) -> Result<Vec<Value>> {
        if self.intercepts(Method::ResultSetHandle) {
            return self.dispatch(Method::ResultSetHandle, vec![Value::Array(rows)]);
        }
        result_set_handler(self.target.as_ref())?.handle_result_sets(rows)
    }
}
