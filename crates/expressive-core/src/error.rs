//! Error taxonomy
//!
//! Run-time failures (bodies, hooks, construction) are values of [`TestError`]
//! and are always converted into `error` events. Declaration-time misuse of the
//! builder is a [`DslError`] and is returned straight to the caller.

use std::any::Any;
use thiserror::Error;

/// Failure raised while running a body or a hook, or while instantiating a spec
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TestError {
    #[error("{0}")]
    Failed(String),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Property(#[from] PropertyError),

    #[error("failed to construct '{description}': {reason}")]
    Construction { description: String, reason: String },
}

/// Result of a body or hook invocation
pub type TestResult = Result<(), TestError>;

impl TestError {
    /// Failure with a plain message
    pub fn msg(message: impl std::fmt::Display) -> Self {
        TestError::Failed(message.to_string())
    }

    /// Construction failure for a spec with the given description
    pub fn construction(description: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        TestError::Construction {
            description: description.into(),
            reason: reason.to_string(),
        }
    }

    /// Convert a caught panic payload
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TestError::Panicked(message)
    }
}

impl From<String> for TestError {
    fn from(message: String) -> Self {
        TestError::Failed(message)
    }
}

impl From<&str> for TestError {
    fn from(message: &str) -> Self {
        TestError::Failed(message.to_string())
    }
}

/// Property lookup failure on a [`Context`](crate::Context)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("property '{name}' is not defined")]
    Undefined { name: String },

    #[error("property '{name}' is not a {expected}")]
    TypeMismatch { name: String, expected: &'static str },
}

/// Misuse of the declaration builder
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DslError {
    #[error("'{call}' must be called inside an enclosing suite declaration")]
    NoEnclosingSuite { call: &'static str },
}
