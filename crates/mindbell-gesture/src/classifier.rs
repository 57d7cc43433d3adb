//! Mapping of baseline deltas to discrete gesture verdicts.
//!
//! The lateral axis is evaluated first. A deliberate turn often induces an
//! apparent vertical tilt (external monitor geometry, camera placement), so
//! the top gesture is only accepted while the lateral delta stays inside a
//! noise band. The reverse contamination is not observed in practice.

use serde::{Deserialize, Serialize};

use crate::config::SourceConfig;
use crate::sample::ChannelValues;

/// Screen edge a gesture points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    /// Tilt up / pointer to the top edge.
    Top,
    /// Turn left / pointer to the left edge.
    Left,
    /// Turn right / pointer to the right edge.
    Right,
}

impl Edge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Edge::Top => "top",
            Edge::Left => "left",
            Edge::Right => "right",
        }
    }
}

/// Per-frame classification result.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureVerdict {
    #[default]
    None,
    Gesture {
        edge: Edge,
        /// Winning edge's delta relative to its threshold, clamped to [0, 1].
        intensity: f64,
    },
}

impl GestureVerdict {
    pub fn edge(&self) -> Option<Edge> {
        match self {
            GestureVerdict::None => None,
            GestureVerdict::Gesture { edge, .. } => Some(*edge),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, GestureVerdict::None)
    }
}

/// How far the subject has moved towards each edge, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeIntensities {
    pub top: f64,
    pub left: f64,
    pub right: f64,
}

impl EdgeIntensities {
    pub fn get(&self, edge: Edge) -> f64 {
        match edge {
            Edge::Top => self.top,
            Edge::Left => self.left,
            Edge::Right => self.right,
        }
    }

    pub fn max(&self) -> f64 {
        self.top.max(self.left).max(self.right)
    }
}

/// Stateless threshold classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureClassifier {
    pub primary_threshold: f64,
    pub lateral_threshold: f64,
    pub lateral_noise_threshold: f64,
    pub invert_lateral: bool,
}

impl GestureClassifier {
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            primary_threshold: config.primary_threshold,
            lateral_threshold: config.lateral_threshold,
            lateral_noise_threshold: config.lateral_noise_threshold,
            invert_lateral: config.invert_lateral,
        }
    }

    /// Classify one delta-from-baseline sample.
    pub fn classify(&self, delta: ChannelValues) -> (GestureVerdict, EdgeIntensities) {
        let lateral = if self.invert_lateral {
            -delta.lateral
        } else {
            delta.lateral
        };
        let primary = delta.primary;

        let intensities = EdgeIntensities {
            top: ratio(-primary, self.primary_threshold),
            left: ratio(-lateral, self.lateral_threshold),
            right: ratio(lateral, self.lateral_threshold),
        };

        let verdict = if lateral.abs() > self.lateral_threshold {
            let edge = if lateral < 0.0 { Edge::Left } else { Edge::Right };
            GestureVerdict::Gesture {
                edge,
                intensity: intensities.get(edge),
            }
        } else if primary < -self.primary_threshold
            && lateral.abs() <= self.lateral_noise_threshold
        {
            GestureVerdict::Gesture {
                edge: Edge::Top,
                intensity: intensities.top,
            }
        } else {
            GestureVerdict::None
        };

        (verdict, intensities)
    }
}

/// Delta as a fraction of its threshold, clamped to [0, 1].
fn ratio(value: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return if value > 0.0 { 1.0 } else { 0.0 };
    }
    (value / threshold).clamp(0.0, 1.0)
}
