//! Invocation context handed to an observer, and the typed dispatch that
//! lets `proceed` reach the real method.

use crate::error::{Error, Result};
use crate::role::{Method, Role};
use crate::target::{
    CoreObject, Executor, ParameterHandler, ResultSetHandler, RowBounds, Statement,
    StatementHandler, Target,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// One intercepted call: the target it was made on, which method, and the
/// arguments it carried.
pub struct Invocation<'a> {
    target: &'a Target,
    method: Method,
    args: Vec<Value>,
}

impl<'a> Invocation<'a> {
    pub fn new(target: &'a Target, method: Method, args: Vec<Value>) -> Self {
        Self {
            target,
            method,
            args,
        }
    }

    /// The object the call was made on (the next layer inward).
    pub fn target(&self) -> &Target {
        self.target
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Decode one argument into its typed form, e.g. the `Statement` of an
    /// executor call.
    pub fn decode_arg<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        decode_arg(self.method, &self.args, index)
    }

    /// Run the original method on the original target with the original
    /// arguments.
    pub fn proceed(&self) -> Result<Value> {
        invoke(self.target.as_ref(), self.method, &self.args)
    }

    /// Run the original method with substituted arguments.
    pub fn proceed_with(&self, args: Vec<Value>) -> Result<Value> {
        invoke(self.target.as_ref(), self.method, &args)
    }
}

impl std::fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("method", &self.method)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Call `method` on `target` through its typed role view.
pub fn invoke(target: &dyn CoreObject, method: Method, args: &[Value]) -> Result<Value> {
    let expected = method.params().len();
    if args.len() != expected {
        return Err(Error::Argument {
            method,
            index: args.len().min(expected),
            message: format!("expected {} arguments, got {}", expected, args.len()),
        });
    }

    match method {
        Method::ExecutorUpdate => {
            let statement: Statement = decode_arg(method, args, 0)?;
            encode_return(method, executor(target)?.update(&statement, &args[1])?)
        }
        Method::ExecutorQuery => {
            let statement: Statement = decode_arg(method, args, 0)?;
            encode_return(method, executor(target)?.query(&statement, &args[1])?)
        }
        Method::ExecutorQueryWithBounds => {
            let statement: Statement = decode_arg(method, args, 0)?;
            let bounds: RowBounds = decode_arg(method, args, 2)?;
            let rows = executor(target)?.query_with_bounds(&statement, &args[1], bounds)?;
            encode_return(method, rows)
        }
        Method::ExecutorCommit => {
            let required: bool = decode_arg(method, args, 0)?;
            encode_return(method, executor(target)?.commit(required)?)
        }
        Method::ExecutorRollback => {
            let required: bool = decode_arg(method, args, 0)?;
            encode_return(method, executor(target)?.rollback(required)?)
        }
        Method::ExecutorClose => encode_return(method, executor(target)?.close()?),
        Method::ExecutorIsClosed => encode_return(method, executor(target)?.is_closed()?),
        Method::StatementPrepare => encode_return(method, statement_handler(target)?.prepare()?),
        Method::StatementParameterize => {
            encode_return(method, statement_handler(target)?.parameterize()?)
        }
        Method::StatementUpdate => encode_return(method, statement_handler(target)?.update()?),
        Method::StatementQuery => {
            let bounds: RowBounds = decode_arg(method, args, 0)?;
            encode_return(method, statement_handler(target)?.query(bounds)?)
        }
        Method::ParameterGetObject => {
            encode_return(method, parameter_handler(target)?.parameter_object()?)
        }
        Method::ParameterSet => encode_return(method, parameter_handler(target)?.set_parameters()?),
        Method::ResultSetHandle => {
            let rows: Vec<Value> = decode_arg(method, args, 0)?;
            encode_return(method, result_set_handler(target)?.handle_result_sets(rows)?)
        }
    }
}

pub(crate) fn executor(target: &dyn CoreObject) -> Result<&dyn Executor> {
    target.as_executor().ok_or(Error::RoleNotImplemented {
        role: Role::Executor,
    })
}

pub(crate) fn statement_handler(target: &dyn CoreObject) -> Result<&dyn StatementHandler> {
    target.as_statement_handler().ok_or(Error::RoleNotImplemented {
        role: Role::StatementHandler,
    })
}

pub(crate) fn parameter_handler(target: &dyn CoreObject) -> Result<&dyn ParameterHandler> {
    target.as_parameter_handler().ok_or(Error::RoleNotImplemented {
        role: Role::ParameterHandler,
    })
}

pub(crate) fn result_set_handler(target: &dyn CoreObject) -> Result<&dyn ResultSetHandler> {
    target.as_result_set_handler().ok_or(Error::RoleNotImplemented {
        role: Role::ResultSetHandler,
    })
}

pub(crate) fn decode_arg<T: DeserializeOwned>(
    method: Method,
    args: &[Value],
    index: usize,
) -> Result<T> {
    let value = args.get(index).cloned().ok_or_else(|| Error::Argument {
        method,
        index,
        message: "missing".to_string(),
    })?;
    serde_json::from_value(value).map_err(|e| Error::Argument {
        method,
        index,
        message: e.to_string(),
    })
}

pub(crate) fn encode_arg<T: Serialize>(method: Method, index: usize, value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Argument {
        method,
        index,
        message: e.to_string(),
    })
}

pub(crate) fn encode_return<T: Serialize>(method: Method, value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::ReturnValue {
        method,
        message: e.to_string(),
    })
}

pub(crate) fn decode_return<T: DeserializeOwned>(method: Method, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::ReturnValue {
        method,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Closed;

    impl CoreObject for Closed {}

    #[test]
    fn arity_mismatch_is_argument_error() {
        let err = invoke(&Closed, Method::ExecutorQuery, &[json!(null)]).unwrap_err();
        assert!(matches!(err, Error::Argument { index: 1, .. }));
    }

    #[test]
    fn missing_role_is_reported() {
        let err = invoke(&Closed, Method::ExecutorClose, &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::RoleNotImplemented {
                role: Role::Executor
            }
        ));
    }

    #[test]
    fn unit_return_decodes_from_null() {
        decode_return::<()>(Method::ExecutorClose, Value::Null).unwrap();
        assert!(decode_return::<()>(Method::ExecutorClose, json!(1)).is_err());
    }
}
