//! Awareness statistics over recorded chime outcomes.
//!
//! Everything here is a pure function over a snapshot of history; callers
//! query their event store first and compute afterwards.

pub mod error;
pub mod estimator;
pub mod practice;

pub use error::{StatsError, StatsResult};
pub use estimator::{
    effective_sample_size, estimate, estimate_events, lag1_autocorrelation, naive_wilson_interval,
    wilson_interval, AwarenessEstimate, OutcomeCounts, MIN_SAMPLES, Z_95,
};
pub use practice::practice_duration;
