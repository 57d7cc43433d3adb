//! Error types for gesture detection.
//!
//! Degraded input (no face, no pointer, out-of-range settings) is never an
//! error here: it is reported as state or clamped. These variants cover the
//! remaining programmer and integration mistakes.

use thiserror::Error;

/// Result type for gesture operations.
pub type GestureResult<T> = Result<T, GestureError>;

/// Errors that can occur while configuring gesture detection.
#[derive(Debug, Error)]
pub enum GestureError {
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Settings parse error: {0}")]
    SettingsParse(#[from] serde_json::Error),
}

impl GestureError {
    /// Create an invalid settings error.
    pub fn invalid_settings(message: impl Into<String>) -> Self {
        Self::InvalidSettings(message.into())
    }
}
