//! Raw per-frame samples and source identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Sub;
use std::str::FromStr;

use crate::error::GestureError;

/// The two input sources that can answer a chime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// Camera-derived head orientation.
    Head,
    /// Pointer position near the screen edges.
    Pointer,
}

impl InputSource {
    pub const ALL: [InputSource; 2] = [InputSource::Head, InputSource::Pointer];

    pub fn as_str(&self) -> &'static str {
        match self {
            InputSource::Head => "head",
            InputSource::Pointer => "pointer",
        }
    }

    /// The other source.
    pub fn other(&self) -> Self {
        match self {
            InputSource::Head => InputSource::Pointer,
            InputSource::Pointer => InputSource::Head,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            InputSource::Head => 0,
            InputSource::Pointer => 1,
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputSource {
    type Err = GestureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "head" | "camera" => Ok(InputSource::Head),
            "pointer" | "mouse" => Ok(InputSource::Pointer),
            other => Err(GestureError::invalid_settings(format!(
                "unknown input source '{}'",
                other
            ))),
        }
    }
}

/// A pair of channel values: vertical (primary) and horizontal (lateral).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelValues {
    pub primary: f64,
    pub lateral: f64,
}

impl ChannelValues {
    pub fn new(primary: f64, lateral: f64) -> Self {
        Self { primary, lateral }
    }
}

impl Sub for ChannelValues {
    type Output = ChannelValues;

    fn sub(self, rhs: ChannelValues) -> ChannelValues {
        ChannelValues {
            primary: self.primary - rhs.primary,
            lateral: self.lateral - rhs.lateral,
        }
    }
}

/// One frame's raw reading from a source. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub channels: ChannelValues,
    /// Face detected (head) or pointer reading available (pointer).
    pub subject_present: bool,
}

impl RawSample {
    /// Head orientation in radians.
    pub fn head(pitch: f64, yaw: f64, face_detected: bool) -> Self {
        Self {
            channels: ChannelValues::new(pitch, yaw),
            subject_present: face_detected,
        }
    }

    /// Pointer position in normalized screen coordinates (origin top-left).
    pub fn pointer(x: f64, y: f64, available: bool) -> Self {
        Self {
            channels: ChannelValues::new(y, x),
            subject_present: available,
        }
    }

    /// A frame without a detectable subject.
    pub fn absent() -> Self {
        Self {
            channels: ChannelValues::default(),
            subject_present: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_maps_y_to_primary() {
        let sample = RawSample::pointer(0.25, 0.75, true);
        assert_eq!(sample.channels.primary, 0.75);
        assert_eq!(sample.channels.lateral, 0.25);
    }

    #[test]
    fn test_source_parse() {
        assert_eq!("Head".parse::<InputSource>().unwrap(), InputSource::Head);
        assert_eq!("mouse".parse::<InputSource>().unwrap(), InputSource::Pointer);
        assert!("keyboard".parse::<InputSource>().is_err());
        assert_eq!(InputSource::Head.other(), InputSource::Pointer);
    }
}
