//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown outcome: {0}")]
    UnknownOutcome(String),

    #[error("Session {0} is already closed")]
    SessionClosed(String),

    #[error("Session end precedes its start: {0}")]
    InvalidSessionEnd(String),
}

impl ModelError {
    pub fn unknown_outcome(value: impl Into<String>) -> Self {
        Self::UnknownOutcome(value.into())
    }
}
