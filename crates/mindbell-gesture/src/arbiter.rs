//! Cross-source arbitration.
//!
//! Tracks how fast each source is moving, relative to its own gesture
//! range, and selects the source whose output is authoritative. Switching
//! uses a hysteresis ratio and a debounce hold so two similarly noisy
//! sources do not flicker, and never happens while the active source is
//! mid-gesture. Only a source with a present, baselined subject can take
//! over; when exactly one source qualifies it is selected at once.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::EdgeIntensities;
use crate::config::{ArbiterConfig, GestureConfig, SourceConfig};
use crate::pipeline::{PipelineSnapshot, Presence, TriggerEvent};
use crate::sample::{ChannelValues, InputSource};

/// Smallest threshold used when normalizing speeds.
const MIN_SPEED_SCALE: f64 = 1e-3;

/// Unified per-tick output handed to presentation and recording.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ArbiterOutput {
    pub active: Option<InputSource>,
    pub presence: Presence,
    pub intensities: EdgeIntensities,
    pub dwell_progress: f64,
    /// Gesture fired by the active source since the previous tick.
    pub trigger: Option<TriggerEvent>,
    /// The active source changed from one source to the other on this tick.
    pub switched: bool,
}

/// Per-source speed tracking state.
#[derive(Debug, Clone, Copy, Default)]
struct SpeedTracker {
    last: Option<ChannelValues>,
    smoothed: f64,
}

pub struct InputArbiter {
    config: ArbiterConfig,
    /// (primary, lateral) threshold per source, indexed by `InputSource::index`.
    scales: [(f64, f64); 2],
    enabled: [bool; 2],
    speeds: [SpeedTracker; 2],
    /// Last trigger sequence number observed per source.
    seen_seq: [u64; 2],
    active: Option<InputSource>,
    pending: Option<InputSource>,
    pending_since: Option<f64>,
    last_tick: Option<f64>,
}

impl Default for InputArbiter {
    fn default() -> Self {
        Self::new(&GestureConfig::default())
    }
}

impl InputArbiter {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            config: config.arbiter.sanitized(),
            scales: [scale(&config.head), scale(&config.pointer)],
            enabled: [true, true],
            speeds: [SpeedTracker::default(); 2],
            seen_seq: [0, 0],
            active: None,
            pending: None,
            pending_since: None,
            last_tick: None,
        }
    }

    /// Run one arbitration tick over the latest snapshot of each source.
    pub fn tick(
        &mut self,
        now: f64,
        head: &PipelineSnapshot,
        pointer: &PipelineSnapshot,
    ) -> ArbiterOutput {
        let dt = self.last_tick.map(|last| now - last).unwrap_or(0.0);
        self.last_tick = Some(now);
        self.track_speed(head, dt);
        self.track_speed(pointer, dt);

        let previous = self.active;
        let snapshots = [head, pointer];
        self.active = self.select(now, &snapshots);

        let switched = matches!((previous, self.active), (Some(a), Some(b)) if a != b);
        if switched {
            debug!(
                "Switching active source: {:?} -> {:?} (speeds: head {:.2}, pointer {:.2})",
                previous, self.active, self.speeds[0].smoothed, self.speeds[1].smoothed
            );
        }

        // Every new trigger is consumed. A trigger fired since the previous
        // tick is forwarded only if its source was active over that interval.
        let mut trigger = None;
        for snapshot in snapshots {
            let index = snapshot.source.index();
            if snapshot.trigger_seq > self.seen_seq[index] {
                self.seen_seq[index] = snapshot.trigger_seq;
                let source = Some(snapshot.source);
                if source == previous && source == self.active {
                    trigger = snapshot.last_trigger;
                } else {
                    debug!("Suppressed trigger from inactive source {}", snapshot.source);
                }
            }
        }

        let mut output = ArbiterOutput {
            active: self.active,
            trigger,
            switched,
            ..Default::default()
        };
        if let Some(active) = self.active {
            let snapshot = snapshots[active.index()];
            output.presence = snapshot.presence;
            output.intensities = snapshot.intensities;
            output.dwell_progress = snapshot.dwell_progress;
        }
        output
    }

    fn select(&mut self, now: f64, snapshots: &[&PipelineSnapshot; 2]) -> Option<InputSource> {
        let enabled: Vec<InputSource> = InputSource::ALL
            .into_iter()
            .filter(|source| self.enabled[source.index()])
            .collect();

        match enabled.as_slice() {
            [] => {
                self.clear_pending();
                None
            }
            [only] => {
                self.clear_pending();
                Some(*only)
            }
            _ => self.select_between_both(now, snapshots),
        }
    }

    fn select_between_both(
        &mut self,
        now: f64,
        snapshots: &[&PipelineSnapshot; 2],
    ) -> Option<InputSource> {
        let eligible: Vec<InputSource> = InputSource::ALL
            .into_iter()
            .filter(|source| is_eligible(snapshots[source.index()]))
            .collect();

        let current = match self.active {
            Some(current) => current,
            None => {
                self.clear_pending();
                let best = match eligible.as_slice() {
                    [] => return None,
                    [only] => *only,
                    _ if self.speed(InputSource::Pointer) > self.speed(InputSource::Head) => {
                        InputSource::Pointer
                    }
                    _ => InputSource::Head,
                };
                debug!(
                    "Initial active source selection: {} (speed: {:.2})",
                    best,
                    self.speed(best)
                );
                return Some(best);
            }
        };
        let current_eligible = eligible.contains(&current);

        // An in-progress gesture keeps its source while the subject is there.
        if current_eligible && snapshots[current.index()].is_locked() {
            if self.pending.is_some() {
                debug!("Pending switch cancelled, {} holds the gesture lock", current);
            }
            self.clear_pending();
            return Some(current);
        }

        let challenger = current.other();
        if !eligible.contains(&challenger) {
            self.clear_pending();
            return Some(current);
        }
        if !current_eligible {
            debug!("{} has no subject, handing over to {}", current, challenger);
            self.clear_pending();
            return Some(challenger);
        }

        let challenger_speed = self.speed(challenger);
        let dominant = challenger_speed > 0.0
            && challenger_speed > self.speed(current) * self.config.hysteresis_ratio;

        if !dominant {
            self.clear_pending();
            return Some(current);
        }

        let since = match (self.pending, self.pending_since) {
            (Some(pending), Some(since)) if pending == challenger => since,
            _ => {
                self.pending = Some(challenger);
                self.pending_since = Some(now);
                now
            }
        };

        if now - since >= self.config.switch_debounce {
            self.clear_pending();
            Some(challenger)
        } else {
            Some(current)
        }
    }

    fn track_speed(&mut self, snapshot: &PipelineSnapshot, dt: f64) {
        let index = snapshot.source.index();
        let (primary_scale, lateral_scale) = self.scales[index];
        let tracker = &mut self.speeds[index];

        let current = match snapshot.smoothed {
            Some(values) if snapshot.presence == Presence::Present && snapshot.baseline_set => {
                Some(values)
            }
            _ => None,
        };

        let instantaneous = match (tracker.last, current) {
            (Some(last), Some(current)) if dt > 0.0 => {
                let delta = current - last;
                (delta.primary / primary_scale).hypot(delta.lateral / lateral_scale) / dt
            }
            _ => 0.0,
        };
        tracker.last = current;

        let factor = self.config.speed_smoothing;
        tracker.smoothed = (1.0 - factor) * instantaneous + factor * tracker.smoothed;
    }

    fn clear_pending(&mut self) {
        self.pending = None;
        self.pending_since = None;
    }

    /// Smoothed speed of a source, in gesture ranges per second.
    pub fn speed(&self, source: InputSource) -> f64 {
        self.speeds[source.index()].smoothed
    }

    pub fn active(&self) -> Option<InputSource> {
        self.active
    }

    pub fn pending(&self) -> Option<InputSource> {
        self.pending
    }

    pub fn is_enabled(&self, source: InputSource) -> bool {
        self.enabled[source.index()]
    }

    /// Enable or disable a source. Takes effect on the next tick.
    pub fn set_enabled(&mut self, source: InputSource, enabled: bool) {
        self.enabled[source.index()] = enabled;
    }

    /// Forget speeds and the current selection.
    ///
    /// Trigger sequence numbers are kept so a trigger seen before the reset
    /// is never forwarded again.
    pub fn reset(&mut self) {
        self.speeds = [SpeedTracker::default(); 2];
        self.active = None;
        self.clear_pending();
        self.last_tick = None;
    }

    pub fn apply_config(&mut self, config: &GestureConfig) {
        self.config = config.arbiter.sanitized();
        self.scales = [scale(&config.head), scale(&config.pointer)];
    }
}

/// A source can be selected once its subject is present and baselined.
fn is_eligible(snapshot: &PipelineSnapshot) -> bool {
    snapshot.presence == Presence::Present && snapshot.baseline_set
}

fn scale(config: &SourceConfig) -> (f64, f64) {
    (
        config.primary_threshold.max(MIN_SPEED_SCALE),
        config.lateral_threshold.max(MIN_SPEED_SCALE),
    )
}
