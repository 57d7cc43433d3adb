//! Time-in-state estimation from chime outcomes.
//!
//! Each chime samples the user's state: `Present` means aware, `Returned`
//! and `Missed` mean not aware. Consecutive chimes are correlated (awareness
//! is sticky), so the confidence interval uses an effective sample size
//! derived from the lag-1 autocorrelation instead of the raw count.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use mindbell_models::{ChimeEvent, Outcome};

use crate::error::{StatsError, StatsResult};

/// Below this many outcomes an estimate is structurally valid but should
/// not be displayed with a confidence interval.
pub const MIN_SAMPLES: usize = 3;

/// Two-sided 95% normal quantile.
pub const Z_95: f64 = 1.96;

/// Fraction of time spent aware, with a correlation-corrected interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AwarenessEstimate {
    /// Fraction of `Present` outcomes.
    pub point_estimate: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    /// Sample size after the autocorrelation correction.
    pub effective_n: f64,
    /// Outcomes counted (absences excluded).
    pub raw_n: usize,
    /// Lag-1 autocorrelation of the binary sequence, in [-1, 1].
    pub rho: f64,
}

impl AwarenessEstimate {
    pub fn has_enough_data(&self) -> bool {
        self.raw_n >= MIN_SAMPLES
    }

    /// The confidence interval, only when there is enough data to show it.
    pub fn interval(&self) -> Option<(f64, f64)> {
        self.has_enough_data().then_some((self.ci_low, self.ci_high))
    }

    pub fn width(&self) -> f64 {
        self.ci_high - self.ci_low
    }
}

/// Per-outcome tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct OutcomeCounts {
    pub present: usize,
    pub returned: usize,
    pub missed: usize,
    pub absent: usize,
}

impl OutcomeCounts {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut counts = Self::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Present => counts.present += 1,
                Outcome::Returned => counts.returned += 1,
                Outcome::Missed => counts.missed += 1,
                Outcome::Absent => counts.absent += 1,
            }
        }
        counts
    }

    /// All windows, absences included.
    pub fn total(&self) -> usize {
        self.present + self.returned + self.missed + self.absent
    }

    /// Windows answered with a gesture.
    pub fn responded(&self) -> usize {
        self.present + self.returned
    }
}

/// Estimate time-in-state from outcomes ordered by time.
///
/// `Absent` outcomes carry no information about awareness and are skipped.
pub fn estimate(outcomes: &[Outcome]) -> AwarenessEstimate {
    let xs: Vec<f64> = outcomes
        .iter()
        .filter_map(Outcome::as_binary)
        .map(f64::from)
        .collect();

    let raw_n = xs.len();
    let point_estimate = if raw_n == 0 {
        0.0
    } else {
        xs.iter().sum::<f64>() / raw_n as f64
    };

    let rho = lag1_autocorrelation(&xs);
    let effective_n = effective_sample_size(raw_n, rho);
    let (ci_low, ci_high) = wilson_interval(point_estimate, effective_n, Z_95);

    AwarenessEstimate {
        point_estimate,
        ci_low,
        ci_high,
        effective_n,
        raw_n,
        rho,
    }
}

/// Estimate from stored events, which must be in ascending timestamp order.
pub fn estimate_events(events: &[ChimeEvent]) -> StatsResult<AwarenessEstimate> {
    if let Some(index) = events
        .windows(2)
        .position(|pair| pair[1].timestamp < pair[0].timestamp)
    {
        return Err(StatsError::UnorderedEvents { index: index + 1 });
    }

    let outcomes: Vec<Outcome> = events.iter().map(|event| event.outcome).collect();
    let result = estimate(&outcomes);
    debug!(
        "Estimated awareness {:.3} over {} events (rho {:.3}, n_eff {:.2})",
        result.point_estimate, result.raw_n, result.rho, result.effective_n
    );
    Ok(result)
}

/// Lag-1 autocorrelation of a sequence, clamped to [-1, 1].
///
/// Fewer than [`MIN_SAMPLES`] values or a constant sequence give 0.
pub fn lag1_autocorrelation(xs: &[f64]) -> f64 {
    let n = xs.len();
    if n < MIN_SAMPLES {
        return 0.0;
    }

    let mean = xs.iter().sum::<f64>() / n as f64;
    let denom = (n - 1) as f64;
    let variance = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / denom;
    if variance <= f64::EPSILON {
        return 0.0;
    }

    let autocovariance = xs
        .windows(2)
        .map(|pair| (pair[0] - mean) * (pair[1] - mean))
        .sum::<f64>()
        / denom;

    (autocovariance / variance).clamp(-1.0, 1.0)
}

/// Effective sample size of `n` correlated observations.
pub fn effective_sample_size(n: usize, rho: f64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    if rho <= -1.0 {
        n
    } else if rho >= 1.0 {
        1.0
    } else {
        (n * (1.0 - rho) / (1.0 + rho)).max(1.0)
    }
}

/// Wilson score interval for proportion `p` over `n` trials.
///
/// `n` may be fractional (an effective sample size). With no trials the
/// interval is the whole of [0, 1].
pub fn wilson_interval(p: f64, n: f64, z: f64) -> (f64, f64) {
    if n <= 0.0 {
        return (0.0, 1.0);
    }

    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let spread = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;

    ((center - spread).max(0.0), (center + spread).min(1.0))
}

/// Uncorrected 95% Wilson interval over the raw count.
pub fn naive_wilson_interval(p: f64, n: usize) -> (f64, f64) {
    wilson_interval(p, n as f64, Z_95)
}
