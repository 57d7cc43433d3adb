//! Statistics error types.
//!
//! Degenerate data (too few samples, constant sequences) is reported
//! through the estimate itself. Errors here are caller mistakes.

use thiserror::Error;

pub type StatsResult<T> = Result<T, StatsError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("Events are not in ascending time order (at index {index})")]
    UnorderedEvents { index: usize },

    #[error("Invalid range: {0}")]
    InvalidRange(String),
}

impl StatsError {
    pub fn invalid_range(message: impl Into<String>) -> Self {
        Self::InvalidRange(message.into())
    }
}
