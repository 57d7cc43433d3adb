//! Period summaries over stored history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mindbell_models::Outcome;
use mindbell_stats::{estimate_events, practice_duration, AwarenessEstimate, OutcomeCounts};

use crate::error::{EngineError, EngineResult};
use crate::store::EventStore;

/// Everything a dashboard needs for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub estimate: AwarenessEstimate,
    pub counts: OutcomeCounts,
    /// Mean chime-to-gesture latency over responded windows.
    pub mean_latency_ms: Option<f64>,
    /// Total practice time of closed sessions in the period.
    pub practice_seconds: i64,
}

impl PeriodSummary {
    pub fn has_enough_data(&self) -> bool {
        self.estimate.has_enough_data()
    }
}

/// Snapshot the store for `[start, end]`, then compute the summary.
pub async fn summarize_period(
    store: &dyn EventStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> EngineResult<PeriodSummary> {
    if end < start {
        return Err(EngineError::invalid_range(format!(
            "end {} precedes start {}",
            end, start
        )));
    }

    let events = store.query_events(start, end).await?;
    let sessions = store.query_sessions(start, end).await?;

    let estimate = estimate_events(&events)?;
    let outcomes: Vec<Outcome> = events.iter().map(|event| event.outcome).collect();
    let counts = OutcomeCounts::from_outcomes(&outcomes);

    let latencies: Vec<f64> = events
        .iter()
        .filter_map(|event| event.response_latency_ms)
        .map(f64::from)
        .collect();
    let mean_latency_ms = if latencies.is_empty() {
        None
    } else {
        Some(latencies.iter().sum::<f64>() / latencies.len() as f64)
    };

    let practice = practice_duration(&sessions, start, end)?;

    Ok(PeriodSummary {
        start,
        end,
        estimate,
        counts,
        mean_latency_ms,
        practice_seconds: practice.num_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryEventStore;
    use mindbell_models::ChimeEvent;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_summarize_period() {
        let store = InMemoryEventStore::new();
        let session = store.start_session(ts(0)).await.unwrap();
        let outcomes = [
            (Outcome::Present, Some(800)),
            (Outcome::Returned, Some(1200)),
            (Outcome::Missed, None),
            (Outcome::Absent, None),
            (Outcome::Present, Some(1000)),
        ];
        for (i, (outcome, latency)) in outcomes.into_iter().enumerate() {
            store
                .append_event(ChimeEvent::at(ts(60 * (i as i64 + 1)), session.id, outcome, latency))
                .await
                .unwrap();
        }
        store.end_session(session.id, ts(600)).await.unwrap();

        let summary = summarize_period(&store, ts(0), ts(3_600)).await.unwrap();
        assert_eq!(summary.counts.total(), 5);
        assert_eq!(summary.estimate.raw_n, 4);
        assert!((summary.estimate.point_estimate - 0.5).abs() < 1e-12);
        assert_eq!(summary.mean_latency_ms, Some(1000.0));
        assert_eq!(summary.practice_seconds, 600);
        assert!(summary.has_enough_data());
    }

    #[tokio::test]
    async fn test_empty_period() {
        let store = InMemoryEventStore::new();
        let summary = summarize_period(&store, ts(0), ts(10)).await.unwrap();
        assert_eq!(summary.estimate.raw_n, 0);
        assert_eq!(summary.mean_latency_ms, None);
        assert!(!summary.has_enough_data());
    }

    #[tokio::test]
    async fn test_inverted_period() {
        let store = InMemoryEventStore::new();
        assert!(matches!(
            summarize_period(&store, ts(10), ts(0)).await,
            Err(EngineError::InvalidRange(_))
        ));
    }
}
