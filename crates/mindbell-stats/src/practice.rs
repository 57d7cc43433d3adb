//! Total practice time over a period.

use chrono::{DateTime, Duration, Utc};

use mindbell_models::Session;

use crate::error::{StatsError, StatsResult};

/// Sum of the full durations of closed sessions overlapping `[start, end]`.
///
/// A session that straddles the range boundary counts in full. Sessions
/// still running contribute nothing until they are closed.
pub fn practice_duration(
    sessions: &[Session],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> StatsResult<Duration> {
    if end < start {
        return Err(StatsError::invalid_range(format!(
            "end {} precedes start {}",
            end, start
        )));
    }

    Ok(sessions
        .iter()
        .filter(|session| session.overlaps(start, end))
        .filter_map(Session::duration)
        .fold(Duration::zero(), |total, duration| total + duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn closed(start: i64, end: i64) -> Session {
        let mut session = Session::starting_at(ts(start));
        session.end_at(ts(end)).unwrap();
        session
    }

    #[test]
    fn test_sums_overlapping_closed_sessions() {
        let sessions = vec![
            closed(0, 600),
            closed(1_000, 1_300),
            // Outside the range
            closed(10_000, 10_600),
            // Still running
            Session::starting_at(ts(2_000)),
        ];

        let total = practice_duration(&sessions, ts(0), ts(5_000)).unwrap();
        assert_eq!(total, Duration::seconds(900));
    }

    #[test]
    fn test_straddling_session_counts_in_full() {
        let sessions = vec![closed(-300, 300)];
        let total = practice_duration(&sessions, ts(0), ts(100)).unwrap();
        assert_eq!(total, Duration::seconds(600));
    }

    #[test]
    fn test_empty_and_inverted_range() {
        assert_eq!(
            practice_duration(&[], ts(0), ts(10)).unwrap(),
            Duration::zero()
        );
        assert!(matches!(
            practice_duration(&[], ts(10), ts(0)),
            Err(StatsError::InvalidRange(_))
        ));
    }
}
