//! Response recording seam.

use std::sync::Arc;

use async_trait::async_trait;

use mindbell_models::{ChimeEvent, Outcome, SessionId};

use crate::error::EngineResult;
use crate::store::EventStore;

/// Receives exactly one resolved outcome per response window.
#[async_trait]
pub trait ResponseRecorder: Send + Sync {
    async fn record(&self, outcome: Outcome, latency_ms: Option<u32>) -> EngineResult<ChimeEvent>;

    /// Session the recorded events belong to, for log context.
    fn session_id(&self) -> Option<SessionId> {
        None
    }
}

/// Writes each outcome as a `ChimeEvent` into an [`EventStore`].
pub struct StoreRecorder {
    store: Arc<dyn EventStore>,
    session_id: SessionId,
}

impl StoreRecorder {
    pub fn new(store: Arc<dyn EventStore>, session_id: SessionId) -> Self {
        Self { store, session_id }
    }
}

#[async_trait]
impl ResponseRecorder for StoreRecorder {
    async fn record(&self, outcome: Outcome, latency_ms: Option<u32>) -> EngineResult<ChimeEvent> {
        let event = ChimeEvent::new(self.session_id, outcome, latency_ms);
        self.store.append_event(event.clone()).await?;
        Ok(event)
    }

    fn session_id(&self) -> Option<SessionId> {
        Some(self.session_id)
    }
}
