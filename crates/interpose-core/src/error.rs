//! Error types for interpose

use crate::role::{Method, Role};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{role} is not implemented by target")]
    RoleNotImplemented { role: Role },

    #[error("invalid argument {index} for {method}: {message}")]
    Argument {
        method: Method,
        index: usize,
        message: String,
    },

    #[error("incompatible return value from {method}: {message}")]
    ReturnValue { method: Method, message: String },

    #[error("{observer} rejected {method}: {reason}")]
    Rejected {
        observer: String,
        method: Method,
        reason: String,
    },

    #[error("executor is closed")]
    ExecutorClosed,

    #[error("execution error: {0}")]
    Execution(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn rejected(observer: impl Into<String>, method: Method, reason: impl Into<String>) -> Self {
        Self::Rejected {
            observer: observer.into(),
            method,
            reason: reason.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
