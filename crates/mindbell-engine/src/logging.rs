//! Tracing setup and structured window logging.

use tracing::{info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mindbell_gesture::TriggerEvent;
use mindbell_models::SessionId;

use crate::window::WindowResolution;

/// Initialize tracing: colored output for development, JSON when
/// `LOG_FORMAT=json`.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "mindbell=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    let result = if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()
    };

    if result.is_err() {
        warn!("Tracing subscriber already installed");
    }
}

/// Logger for one response window's lifecycle.
///
/// Every line carries the window sequence number and the session it
/// belongs to.
#[derive(Debug, Clone)]
pub struct WindowLogger {
    window: u64,
    session_id: String,
}

impl WindowLogger {
    pub fn new(window: u64, session_id: Option<&SessionId>) -> Self {
        Self {
            window,
            session_id: session_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }

    pub fn log_open(&self, timeout_secs: f64) {
        info!(
            window = self.window,
            session_id = %self.session_id,
            "Window opened (timeout {:.1}s)", timeout_secs
        );
    }

    pub fn log_trigger(&self, trigger: &TriggerEvent) {
        info!(
            window = self.window,
            session_id = %self.session_id,
            source = %trigger.source,
            "Gesture received: {}", trigger.edge.as_str()
        );
    }

    pub fn log_close(&self, resolution: &WindowResolution) {
        match resolution.latency_ms {
            Some(latency) => info!(
                window = self.window,
                session_id = %self.session_id,
                "Window closed: {} after {}ms", resolution.outcome, latency
            ),
            None => info!(
                window = self.window,
                session_id = %self.session_id,
                "Window closed: {}", resolution.outcome
            ),
        }
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            window = self.window,
            session_id = %self.session_id,
            "Window warning: {}", message
        );
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "window",
            window = self.window,
            session_id = %self.session_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_logger_without_session() {
        let logger = WindowLogger::new(3, None);
        assert_eq!(logger.window(), 3);
        assert_eq!(logger.session_id, "-");
    }

    #[test]
    fn test_window_logger_with_session() {
        let session = SessionId::new();
        let logger = WindowLogger::new(1, Some(&session));
        assert_eq!(logger.session_id, session.to_string());
    }
}
