//! Dwell gating of gesture verdicts.
//!
//! A verdict must persist continuously for the dwell time before it fires.
//! After firing, the gate stays locked until a neutral verdict is seen, so
//! a held gesture fires exactly once.

use tracing::debug;

use crate::classifier::{Edge, GestureVerdict};

/// Dwell state machine phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DwellPhase {
    /// No verdict held.
    Idle,
    /// A verdict is being held since `started_at`.
    Dwelling { edge: Edge, started_at: f64 },
}

/// Result of feeding one verdict into the gate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DwellUpdate {
    /// Fraction of the dwell time elapsed, in [0, 1].
    pub progress: f64,
    /// Edge that fired on this frame, if any.
    pub fired: Option<Edge>,
    /// Gate is locked until the subject returns to neutral.
    pub awaiting_neutral: bool,
}

#[derive(Debug, Clone)]
pub struct DwellGate {
    phase: DwellPhase,
    requires_return_to_neutral: bool,
    progress: f64,
}

impl Default for DwellGate {
    fn default() -> Self {
        Self::new()
    }
}

impl DwellGate {
    pub fn new() -> Self {
        Self {
            phase: DwellPhase::Idle,
            requires_return_to_neutral: false,
            progress: 0.0,
        }
    }

    /// Advance the gate with this frame's verdict.
    pub fn update(&mut self, verdict: GestureVerdict, now: f64, dwell_time: f64) -> DwellUpdate {
        let edge = match verdict.edge() {
            Some(edge) if !self.requires_return_to_neutral => edge,
            Some(_) => {
                // Locked: no new dwell may start until neutral.
                self.clear_dwell();
                return self.snapshot(None);
            }
            None => {
                if self.requires_return_to_neutral {
                    debug!("Returned to neutral, dwell gate re-armed");
                }
                self.requires_return_to_neutral = false;
                self.clear_dwell();
                return self.snapshot(None);
            }
        };

        let started_at = match self.phase {
            DwellPhase::Dwelling {
                edge: dwelling,
                started_at,
            } if dwelling == edge => started_at,
            _ => {
                debug!("Dwell started on {}", edge.as_str());
                self.phase = DwellPhase::Dwelling {
                    edge,
                    started_at: now,
                };
                now
            }
        };

        let elapsed = (now - started_at).max(0.0);
        if elapsed >= dwell_time {
            debug!("Dwell fired on {} after {:.3}s", edge.as_str(), elapsed);
            self.requires_return_to_neutral = true;
            self.clear_dwell();
            // Report completion on the firing frame.
            return DwellUpdate {
                progress: 1.0,
                fired: Some(edge),
                awaiting_neutral: true,
            };
        }

        self.progress = (elapsed / dwell_time).min(1.0);
        self.snapshot(None)
    }

    pub fn phase(&self) -> DwellPhase {
        self.phase
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn awaiting_neutral(&self) -> bool {
        self.requires_return_to_neutral
    }

    /// Edge currently being dwelled on.
    pub fn dwelling_edge(&self) -> Option<Edge> {
        match self.phase {
            DwellPhase::Idle => None,
            DwellPhase::Dwelling { edge, .. } => Some(edge),
        }
    }

    pub fn reset(&mut self) {
        self.clear_dwell();
        self.requires_return_to_neutral = false;
    }

    fn clear_dwell(&mut self) {
        self.phase = DwellPhase::Idle;
        self.progress = 0.0;
    }

    fn snapshot(&self, fired: Option<Edge>) -> DwellUpdate {
        DwellUpdate {
            progress: self.progress,
            fired,
            awaiting_neutral: self.requires_return_to_neutral,
        }
    }
}
