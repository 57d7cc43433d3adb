//! Event history persistence seam.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use mindbell_models::{ChimeEvent, Session, SessionId};

use crate::error::{EngineError, EngineResult};

/// Append-only store of chime events and practice sessions.
///
/// Queries return owned snapshots, so callers compute over data that can
/// no longer change underneath them.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist one immutable event.
    async fn append_event(&self, event: ChimeEvent) -> EngineResult<()>;

    /// Events with `start <= timestamp <= end`, ascending by timestamp.
    async fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<ChimeEvent>>;

    async fn start_session(&self, at: DateTime<Utc>) -> EngineResult<Session>;

    async fn end_session(&self, id: SessionId, at: DateTime<Utc>) -> EngineResult<Session>;

    /// Sessions overlapping `[start, end]`, ascending by start time.
    async fn query_sessions(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<Session>>;
}

/// In-process event store.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    /// Kept sorted by timestamp.
    events: RwLock<Vec<ChimeEvent>>,
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }
}

fn check_range(start: DateTime<Utc>, end: DateTime<Utc>) -> EngineResult<()> {
    if end < start {
        return Err(EngineError::invalid_range(format!(
            "end {} precedes start {}",
            end, start
        )));
    }
    Ok(())
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append_event(&self, event: ChimeEvent) -> EngineResult<()> {
        let mut events = self.events.write().await;
        if events.iter().any(|existing| existing.id == event.id) {
            return Err(EngineError::DuplicateEvent(event.id.to_string()));
        }

        // Insert after any event with the same timestamp to keep arrival order.
        let index = events.partition_point(|existing| existing.timestamp <= event.timestamp);
        debug!("Stored event {} ({})", event.id, event.outcome);
        events.insert(index, event);
        Ok(())
    }

    async fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<ChimeEvent>> {
        check_range(start, end)?;
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|event| event.timestamp >= start && event.timestamp <= end)
            .cloned()
            .collect())
    }

    async fn start_session(&self, at: DateTime<Utc>) -> EngineResult<Session> {
        let session = Session::starting_at(at);
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn end_session(&self, id: SessionId, at: DateTime<Utc>) -> EngineResult<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| EngineError::session_not_found(id.to_string()))?;
        session.end_at(at)?;
        Ok(session.clone())
    }

    async fn query_sessions(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<Session>> {
        check_range(start, end)?;
        let sessions = self.sessions.read().await;
        let mut result: Vec<Session> = sessions
            .values()
            .filter(|session| session.overlaps(start, end))
            .cloned()
            .collect();
        result.sort_by_key(|session| session.started_at);
        Ok(result)
    }
}
