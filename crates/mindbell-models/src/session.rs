//! Practice session records.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// Unique identifier for a practice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A practice session. Open until `ended_at` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Session {
    /// Unique session ID
    pub id: SessionId,

    /// Session start
    pub started_at: DateTime<Utc>,

    /// Session end (None while the session is running)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Start a new session now.
    pub fn start() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Start a new session at an explicit time.
    pub fn starting_at(started_at: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            started_at,
            ended_at: None,
        }
    }

    /// Close the session.
    pub fn end_at(&mut self, ended_at: DateTime<Utc>) -> ModelResult<()> {
        if self.ended_at.is_some() {
            return Err(ModelError::SessionClosed(self.id.to_string()));
        }
        if ended_at < self.started_at {
            return Err(ModelError::InvalidSessionEnd(self.id.to_string()));
        }
        self.ended_at = Some(ended_at);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Duration of a closed session. Open sessions have none.
    pub fn duration(&self) -> Option<Duration> {
        self.ended_at.map(|end| end - self.started_at)
    }

    /// Whether the session span touches `[start, end]`.
    ///
    /// Open sessions are treated as still running.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let session_end = self.ended_at.unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.started_at <= end && session_end >= start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_session_lifecycle() {
        let mut session = Session::starting_at(ts(0));
        assert!(!session.is_closed());
        assert_eq!(session.duration(), None);

        session.end_at(ts(600)).unwrap();
        assert!(session.is_closed());
        assert_eq!(session.duration(), Some(Duration::seconds(600)));
    }

    #[test]
    fn test_session_cannot_close_twice() {
        let mut session = Session::starting_at(ts(0));
        session.end_at(ts(10)).unwrap();
        assert!(matches!(
            session.end_at(ts(20)),
            Err(ModelError::SessionClosed(_))
        ));
    }

    #[test]
    fn test_session_end_before_start() {
        let mut session = Session::starting_at(ts(100));
        assert!(matches!(
            session.end_at(ts(50)),
            Err(ModelError::InvalidSessionEnd(_))
        ));
    }

    #[test]
    fn test_overlaps() {
        let mut session = Session::starting_at(ts(100));
        session.end_at(ts(200)).unwrap();

        assert!(session.overlaps(ts(0), ts(150)));
        assert!(session.overlaps(ts(150), ts(300)));
        assert!(session.overlaps(ts(200), ts(300)));
        assert!(!session.overlaps(ts(201), ts(300)));
        assert!(!session.overlaps(ts(0), ts(99)));

        let open = Session::starting_at(ts(100));
        assert!(open.overlaps(ts(1000), ts(2000)));
    }
}
