//! Engine configuration.

use std::time::Duration;

use mindbell_gesture::GestureConfig;

use crate::error::EngineResult;
use crate::window::{AbsencePolicy, WindowConfig};

/// Largest accepted response timeout.
const MAX_RESPONSE_TIMEOUT_SECS: f64 = 600.0;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Detection and arbitration settings
    pub gesture: GestureConfig,
    /// Response window behaviour
    pub window: WindowConfig,
    /// Bounded capacity of each per-source sample channel
    pub sample_channel_capacity: usize,
    /// Bounded capacity of the presentation frame channel
    pub presentation_capacity: usize,
    /// Bounded capacity of the control command channel
    pub control_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gesture: GestureConfig::default(),
            window: WindowConfig::default(),
            sample_channel_capacity: 64,
            presentation_capacity: 16,
            control_capacity: 32,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let timeout_secs = std::env::var("MINDBELL_RESPONSE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(|secs| secs.min(MAX_RESPONSE_TIMEOUT_SECS))
            .unwrap_or(defaults.window.response_timeout.as_secs_f64());

        Self {
            gesture: GestureConfig::from_env(),
            window: WindowConfig {
                response_timeout: Duration::from_secs_f64(timeout_secs),
                absence_policy: std::env::var("MINDBELL_ABSENCE_POLICY")
                    .ok()
                    .and_then(|s| s.parse::<AbsencePolicy>().ok())
                    .unwrap_or(defaults.window.absence_policy),
                outcomes: defaults.window.outcomes,
            },
            sample_channel_capacity: std::env::var("MINDBELL_SAMPLE_CHANNEL_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.sample_channel_capacity),
            presentation_capacity: std::env::var("MINDBELL_PRESENTATION_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.presentation_capacity),
            control_capacity: defaults.control_capacity,
        }
    }

    /// Replace the gesture settings with a JSON settings document.
    ///
    /// Keys missing from the document keep their defaults.
    pub fn with_gesture_json(mut self, json: &str) -> EngineResult<Self> {
        self.gesture = GestureConfig::from_json(json)?;
        Ok(self)
    }

    /// Arbitration tick period.
    pub fn tick_interval(&self) -> Duration {
        tick_interval(&self.gesture)
    }
}

/// Tick period for a gesture configuration, after clamping.
pub fn tick_interval(gesture: &GestureConfig) -> Duration {
    Duration::from_secs_f64(gesture.arbiter.sanitized().tick_interval)
}
