//! Input fusion and gesture detection.
//!
//! Raw head-orientation and pointer samples flow through one generic
//! pipeline per source:
//!
//! ```text
//! RawSample → SignalSmoother → BaselineCapture → GestureClassifier → DwellGate
//! ```
//!
//! and an [`InputArbiter`] decides on a fixed tick which source's
//! intensities and triggers reach downstream consumers.
//!
//! Everything here is synchronous and allocation-free per frame; the async
//! host lives in the engine crate.

pub mod arbiter;
pub mod baseline;
pub mod classifier;
pub mod config;
pub mod dwell;
pub mod error;
pub mod pipeline;
pub mod sample;
pub mod smoother;
pub mod sources;

pub use arbiter::{ArbiterOutput, InputArbiter};
pub use baseline::BaselineCapture;
pub use classifier::{Edge, EdgeIntensities, GestureClassifier, GestureVerdict};
pub use config::{ArbiterConfig, GestureConfig, SourceConfig};
pub use dwell::{DwellGate, DwellPhase, DwellUpdate};
pub use error::{GestureError, GestureResult};
pub use pipeline::{GesturePipeline, PipelineSnapshot, Presence, SourceProfile, TriggerEvent};
pub use sample::{ChannelValues, InputSource, RawSample};
pub use smoother::SignalSmoother;
pub use sources::{HeadPose, HeadPoseSource, PointerEdge, PointerEdgeSource};
