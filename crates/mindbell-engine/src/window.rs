//! Response windows.
//!
//! A window opens when a chime plays and closes exactly once: on the first
//! forwarded gesture, on timeout, or when the host closes it early.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use mindbell_gesture::{Edge, TriggerEvent};
use mindbell_models::Outcome;

use crate::error::EngineError;

/// What to record when a window times out and the subject was never seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsencePolicy {
    /// Treat it like any other non-response.
    CountAsMissed,
    /// Record a distinct `Absent` outcome, excluded from estimation.
    #[default]
    RecordAbsent,
}

impl FromStr for AbsencePolicy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "count_as_missed" | "missed" => Ok(AbsencePolicy::CountAsMissed),
            "record_absent" | "absent" => Ok(AbsencePolicy::RecordAbsent),
            other => Err(EngineError::config_error(format!(
                "unknown absence policy '{}'",
                other
            ))),
        }
    }
}

/// Outcome recorded for each gesture edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeOutcomeMap {
    pub top: Outcome,
    pub left: Outcome,
    pub right: Outcome,
}

impl Default for EdgeOutcomeMap {
    fn default() -> Self {
        Self {
            top: Outcome::Present,
            left: Outcome::Returned,
            right: Outcome::Returned,
        }
    }
}

impl EdgeOutcomeMap {
    pub fn outcome(&self, edge: Edge) -> Outcome {
        match edge {
            Edge::Top => self.top,
            Edge::Left => self.left,
            Edge::Right => self.right,
        }
    }
}

/// Window behaviour settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// How long a window waits for a gesture.
    pub response_timeout: Duration,
    pub absence_policy: AbsencePolicy,
    pub outcomes: EdgeOutcomeMap,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(10),
            absence_policy: AbsencePolicy::default(),
            outcomes: EdgeOutcomeMap::default(),
        }
    }
}

/// How a window closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowResolution {
    pub outcome: Outcome,
    /// Milliseconds from opening to the trigger, for gesture responses.
    pub latency_ms: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ResponseWindow {
    opened_at: f64,
    timeout: f64,
    closed: bool,
}

impl ResponseWindow {
    /// Open a window at host time `now` (seconds).
    pub fn open(now: f64, timeout: Duration) -> Self {
        Self {
            opened_at: now,
            timeout: timeout.as_secs_f64(),
            closed: false,
        }
    }

    pub fn opened_at(&self) -> f64 {
        self.opened_at
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Advance the window by one tick.
    ///
    /// Returns the resolution on the tick the window closes and `None`
    /// before and after that.
    pub fn poll(
        &mut self,
        now: f64,
        trigger: Option<TriggerEvent>,
        subject_seen: bool,
        config: &WindowConfig,
    ) -> Option<WindowResolution> {
        if self.closed {
            return None;
        }

        if let Some(trigger) = trigger {
            self.closed = true;
            let latency = ((trigger.at - self.opened_at).max(0.0) * 1000.0).round();
            return Some(WindowResolution {
                outcome: config.outcomes.outcome(trigger.edge),
                latency_ms: Some(latency.min(u32::MAX as f64) as u32),
            });
        }

        if now - self.opened_at >= self.timeout {
            return self.close(subject_seen, config);
        }

        None
    }

    /// Close without a gesture, as on timeout.
    pub fn close(&mut self, subject_seen: bool, config: &WindowConfig) -> Option<WindowResolution> {
        if self.closed {
            return None;
        }
        self.closed = true;

        let outcome = match (subject_seen, config.absence_policy) {
            (true, _) | (false, AbsencePolicy::CountAsMissed) => Outcome::Missed,
            (false, AbsencePolicy::RecordAbsent) => Outcome::Absent,
        };
        Some(WindowResolution {
            outcome,
            latency_ms: None,
        })
    }
}
