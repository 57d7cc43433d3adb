//! Runtime metrics.
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! these calls are no-ops.

use metrics::{counter, gauge};

use mindbell_gesture::{Edge, InputSource};
use mindbell_models::Outcome;

/// Metric names as constants for consistency.
pub mod names {
    pub const TRIGGERS_TOTAL: &str = "mindbell_triggers_total";
    pub const SAMPLES_DROPPED_TOTAL: &str = "mindbell_samples_dropped_total";
    pub const ARBITER_SWITCHES_TOTAL: &str = "mindbell_arbiter_switches_total";
    pub const WINDOWS_TOTAL: &str = "mindbell_windows_total";
    pub const ACTIVE_SOURCE: &str = "mindbell_active_source";
}

/// Record a forwarded gesture trigger.
pub fn record_trigger(source: InputSource, edge: Edge) {
    let labels = [
        ("source", source.as_str().to_string()),
        ("edge", edge.as_str().to_string()),
    ];
    counter!(names::TRIGGERS_TOTAL, &labels).increment(1);
}

/// Record a sample dropped because its channel was full.
pub fn record_sample_dropped(source: InputSource) {
    let labels = [("source", source.as_str().to_string())];
    counter!(names::SAMPLES_DROPPED_TOTAL, &labels).increment(1);
}

/// Record an arbitration switch to `to`.
pub fn record_arbiter_switch(to: InputSource) {
    let labels = [("to", to.as_str().to_string())];
    counter!(names::ARBITER_SWITCHES_TOTAL, &labels).increment(1);
}

/// Record a closed response window.
pub fn record_window(outcome: Outcome) {
    let labels = [("outcome", outcome.as_str().to_string())];
    counter!(names::WINDOWS_TOTAL, &labels).increment(1);
}

/// Update the active source gauge (0 = none, 1 = head, 2 = pointer).
pub fn set_active_source(source: Option<InputSource>) {
    gauge!(names::ACTIVE_SOURCE).set(active_source_value(source));
}

fn active_source_value(source: Option<InputSource>) -> f64 {
    match source {
        None => 0.0,
        Some(InputSource::Head) => 1.0,
        Some(InputSource::Pointer) => 2.0,
    }
}
