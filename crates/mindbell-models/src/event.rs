//! Chime event records.
//!
//! A chime opens a response window; the window ends with exactly one
//! [`ChimeEvent`]. Events are immutable once written and are queried
//! by time range.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ModelError;
use crate::session::SessionId;

/// Unique identifier for a chime event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Generate a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a response window ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The user was already aware when the chime sounded.
    Present,
    /// The user had drifted and the chime brought them back.
    Returned,
    /// No response before the window timed out.
    Missed,
    /// The subject was never observable during the window.
    Absent,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Present => "present",
            Outcome::Returned => "returned",
            Outcome::Missed => "missed",
            Outcome::Absent => "absent",
        }
    }

    /// Binary encoding used by time-in-state estimation.
    ///
    /// `Absent` carries no information about awareness and has no encoding.
    pub fn as_binary(&self) -> Option<u8> {
        match self {
            Outcome::Present => Some(1),
            Outcome::Returned | Outcome::Missed => Some(0),
            Outcome::Absent => None,
        }
    }

    /// Whether this outcome came from an explicit user gesture.
    pub fn is_response(&self) -> bool {
        matches!(self, Outcome::Present | Outcome::Returned)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "present" => Ok(Outcome::Present),
            "returned" => Ok(Outcome::Returned),
            "missed" => Ok(Outcome::Missed),
            "absent" => Ok(Outcome::Absent),
            other => Err(ModelError::unknown_outcome(other)),
        }
    }
}

/// A persisted chime event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChimeEvent {
    /// Unique event ID
    pub id: EventId,

    /// When the response window closed
    pub timestamp: DateTime<Utc>,

    /// Resolved outcome
    pub outcome: Outcome,

    /// Time from chime to gesture trigger (responses only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_latency_ms: Option<u32>,

    /// Session the chime belonged to
    pub session_id: SessionId,
}

impl ChimeEvent {
    /// Create a new event stamped with the current time.
    pub fn new(session_id: SessionId, outcome: Outcome, response_latency_ms: Option<u32>) -> Self {
        Self::at(Utc::now(), session_id, outcome, response_latency_ms)
    }

    /// Create a new event with an explicit timestamp.
    pub fn at(
        timestamp: DateTime<Utc>,
        session_id: SessionId,
        outcome: Outcome,
        response_latency_ms: Option<u32>,
    ) -> Self {
        // Latency only has meaning for an actual gesture.
        let response_latency_ms = if outcome.is_response() {
            response_latency_ms
        } else {
            None
        };

        Self {
            id: EventId::new(),
            timestamp,
            outcome,
            response_latency_ms,
            session_id,
        }
    }
}
