//! Configuration for gesture detection and input arbitration.
//!
//! All values are user-tunable at runtime. Out-of-range values are clamped
//! by [`GestureConfig::sanitized`] rather than rejected, and a new config can
//! be applied to running pipelines without resetting dwell progress.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GestureError, GestureResult};

/// Largest accepted threshold (radians for head, screen fraction for pointer).
pub const MAX_THRESHOLD: f64 = 2.0;
/// Largest accepted dwell time in seconds.
pub const MAX_DWELL_TIME: f64 = 5.0;
/// Smoothing coefficients must stay strictly below 1.0 or the filter never moves.
pub const MAX_SMOOTHING: f64 = 0.99;
/// Largest accepted warm-up skip count.
pub const MAX_FRAMES_TO_SKIP: u32 = 120;
/// Largest accepted hysteresis ratio.
pub const MAX_HYSTERESIS_RATIO: f64 = 10.0;
/// Largest accepted switch debounce in seconds.
pub const MAX_SWITCH_DEBOUNCE: f64 = 10.0;

/// Per-source detection settings.
///
/// The primary channel is the vertical axis (head pitch, pointer y) and the
/// lateral channel is the horizontal axis (head yaw, pointer x).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Delta on the primary channel needed for the top gesture.
    pub primary_threshold: f64,

    /// Delta on the lateral channel needed for a left/right gesture.
    pub lateral_threshold: f64,

    /// The top gesture is only accepted while the lateral delta stays
    /// within this band, so a turn is never misread as a tilt.
    pub lateral_noise_threshold: f64,

    /// IIR smoothing coefficient (0 = raw, towards 1 = smoother/slower).
    pub smoothing_factor: f64,

    /// Seconds a verdict must persist before it fires (0 = immediately).
    pub dwell_time: f64,

    /// Frames ignored after activation before the baseline is captured.
    pub frames_to_skip: u32,

    /// Flip the sign of the lateral channel (mirrored camera).
    pub invert_lateral: bool,
}

impl SourceConfig {
    /// Defaults for head orientation in radians.
    pub fn head() -> Self {
        Self {
            primary_threshold: 0.12,
            lateral_threshold: 0.20,
            lateral_noise_threshold: 0.10,
            smoothing_factor: 0.3,
            dwell_time: 0.15,
            frames_to_skip: 3,
            invert_lateral: false,
        }
    }

    /// Defaults for pointer position in normalized screen units.
    pub fn pointer() -> Self {
        Self {
            primary_threshold: 0.15,
            lateral_threshold: 0.20,
            lateral_noise_threshold: 0.10,
            smoothing_factor: 0.3,
            dwell_time: 0.15,
            frames_to_skip: 3,
            invert_lateral: false,
        }
    }

    /// Clamp every value into its accepted range.
    pub fn sanitized(&self, label: &str) -> Self {
        let defaults = if label == "pointer" {
            Self::pointer()
        } else {
            Self::head()
        };

        Self {
            primary_threshold: clamp_setting(
                label,
                "primary_threshold",
                self.primary_threshold,
                0.0,
                MAX_THRESHOLD,
                defaults.primary_threshold,
            ),
            lateral_threshold: clamp_setting(
                label,
                "lateral_threshold",
                self.lateral_threshold,
                0.0,
                MAX_THRESHOLD,
                defaults.lateral_threshold,
            ),
            lateral_noise_threshold: clamp_setting(
                label,
                "lateral_noise_threshold",
                self.lateral_noise_threshold,
                0.0,
                MAX_THRESHOLD,
                defaults.lateral_noise_threshold,
            ),
            smoothing_factor: clamp_setting(
                label,
                "smoothing_factor",
                self.smoothing_factor,
                0.0,
                MAX_SMOOTHING,
                defaults.smoothing_factor,
            ),
            dwell_time: clamp_setting(
                label,
                "dwell_time",
                self.dwell_time,
                0.0,
                MAX_DWELL_TIME,
                defaults.dwell_time,
            ),
            frames_to_skip: if self.frames_to_skip > MAX_FRAMES_TO_SKIP {
                warn!(
                    "{}.frames_to_skip {} out of range, clamped to {}",
                    label, self.frames_to_skip, MAX_FRAMES_TO_SKIP
                );
                MAX_FRAMES_TO_SKIP
            } else {
                self.frames_to_skip
            },
            invert_lateral: self.invert_lateral,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::head()
    }
}

/// Settings for choosing between the head and pointer sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    /// EMA coefficient applied to each source's activity speed.
    pub speed_smoothing: f64,

    /// A challenger must be this many times faster than the active source.
    pub hysteresis_ratio: f64,

    /// Seconds a switch suggestion must stay dominant before it applies.
    pub switch_debounce: f64,

    /// Arbitration tick period in seconds.
    pub tick_interval: f64,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            speed_smoothing: 0.8,
            hysteresis_ratio: 1.2,
            switch_debounce: 0.5,
            tick_interval: 0.033,
        }
    }
}

impl ArbiterConfig {
    /// Clamp every value into its accepted range.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            speed_smoothing: clamp_setting(
                "arbiter",
                "speed_smoothing",
                self.speed_smoothing,
                0.0,
                MAX_SMOOTHING,
                defaults.speed_smoothing,
            ),
            hysteresis_ratio: clamp_setting(
                "arbiter",
                "hysteresis_ratio",
                self.hysteresis_ratio,
                1.0,
                MAX_HYSTERESIS_RATIO,
                defaults.hysteresis_ratio,
            ),
            switch_debounce: clamp_setting(
                "arbiter",
                "switch_debounce",
                self.switch_debounce,
                0.0,
                MAX_SWITCH_DEBOUNCE,
                defaults.switch_debounce,
            ),
            tick_interval: clamp_setting(
                "arbiter",
                "tick_interval",
                self.tick_interval,
                0.005,
                1.0,
                defaults.tick_interval,
            ),
        }
    }
}

/// Complete gesture configuration handed down by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub head: SourceConfig,
    pub pointer: SourceConfig,
    pub arbiter: ArbiterConfig,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            head: SourceConfig::head(),
            pointer: SourceConfig::pointer(),
            arbiter: ArbiterConfig::default(),
        }
    }
}

impl GestureConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        let head_defaults = SourceConfig::head();
        let pointer_defaults = SourceConfig::pointer();
        let arbiter_defaults = ArbiterConfig::default();

        Self {
            head: SourceConfig {
                primary_threshold: env_or("MINDBELL_PITCH_THRESHOLD", head_defaults.primary_threshold),
                lateral_threshold: env_or("MINDBELL_YAW_THRESHOLD", head_defaults.lateral_threshold),
                lateral_noise_threshold: env_or(
                    "MINDBELL_YAW_NOISE_THRESHOLD",
                    head_defaults.lateral_noise_threshold,
                ),
                smoothing_factor: env_or("MINDBELL_SMOOTHING_FACTOR", head_defaults.smoothing_factor),
                dwell_time: env_or("MINDBELL_DWELL_TIME", head_defaults.dwell_time),
                frames_to_skip: env_or("MINDBELL_FRAMES_TO_SKIP", head_defaults.frames_to_skip),
                invert_lateral: env_or("MINDBELL_MIRROR_CAMERA", head_defaults.invert_lateral),
            },
            pointer: SourceConfig {
                primary_threshold: env_or(
                    "MINDBELL_POINTER_VERTICAL_THRESHOLD",
                    pointer_defaults.primary_threshold,
                ),
                lateral_threshold: env_or(
                    "MINDBELL_POINTER_HORIZONTAL_THRESHOLD",
                    pointer_defaults.lateral_threshold,
                ),
                lateral_noise_threshold: env_or(
                    "MINDBELL_POINTER_NOISE_THRESHOLD",
                    pointer_defaults.lateral_noise_threshold,
                ),
                smoothing_factor: env_or(
                    "MINDBELL_POINTER_SMOOTHING_FACTOR",
                    pointer_defaults.smoothing_factor,
                ),
                dwell_time: env_or("MINDBELL_POINTER_DWELL_TIME", pointer_defaults.dwell_time),
                frames_to_skip: env_or(
                    "MINDBELL_POINTER_FRAMES_TO_SKIP",
                    pointer_defaults.frames_to_skip,
                ),
                invert_lateral: false,
            },
            arbiter: ArbiterConfig {
                speed_smoothing: env_or("MINDBELL_SPEED_SMOOTHING", arbiter_defaults.speed_smoothing),
                hysteresis_ratio: env_or("MINDBELL_HYSTERESIS_RATIO", arbiter_defaults.hysteresis_ratio),
                switch_debounce: env_or("MINDBELL_SWITCH_DEBOUNCE", arbiter_defaults.switch_debounce),
                tick_interval: env_or("MINDBELL_TICK_INTERVAL", arbiter_defaults.tick_interval),
            },
        }
        .sanitized()
    }

    /// Parse a JSON settings document. Missing keys keep their defaults.
    ///
    /// The document is merged over the defaults key by key, so a partial
    /// `pointer` object keeps the pointer defaults rather than the head ones.
    pub fn from_json(json: &str) -> GestureResult<Self> {
        let overrides: serde_json::Value = serde_json::from_str(json)?;
        if !overrides.is_object() {
            return Err(GestureError::invalid_settings(
                "settings document must be a JSON object",
            ));
        }

        let mut merged = serde_json::to_value(Self::default())?;
        merge_json(&mut merged, overrides);
        let config: Self = serde_json::from_value(merged)?;
        Ok(config.sanitized())
    }

    /// Clamp every value into its accepted range.
    pub fn sanitized(&self) -> Self {
        Self {
            head: self.head.sanitized("head"),
            pointer: self.pointer.sanitized("pointer"),
            arbiter: self.arbiter.sanitized(),
        }
    }
}

fn merge_json(base: &mut serde_json::Value, overrides: serde_json::Value) {
    match (base, overrides) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn clamp_setting(label: &str, name: &str, value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if !value.is_finite() {
        warn!("{}.{} is not finite, using {}", label, name, fallback);
        return fallback;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!("{}.{} {} out of range, clamped to {}", label, name, value, clamped);
    }
    clamped
}
