//! Engine error types.

use thiserror::Error;

use mindbell_gesture::GestureError;
use mindbell_models::ModelError;
use mindbell_stats::StatsError;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Duplicate event: {0}")]
    DuplicateEvent(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Runtime task failed: {0}")]
    TaskFailed(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),

    #[error("Gesture error: {0}")]
    Gesture(#[from] GestureError),
}

impl EngineError {
    pub fn channel_closed(msg: impl Into<String>) -> Self {
        Self::ChannelClosed(msg.into())
    }

    pub fn session_not_found(msg: impl Into<String>) -> Self {
        Self::SessionNotFound(msg.into())
    }

    pub fn invalid_range(msg: impl Into<String>) -> Self {
        Self::InvalidRange(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
