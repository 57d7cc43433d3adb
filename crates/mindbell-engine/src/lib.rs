//! Async host for mindbell.
//!
//! This crate wires the synchronous gesture pipelines into a tokio runtime,
//! resolves one outcome per chime through a response window, and records
//! outcomes into an event store that the statistics crate summarizes.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod recorder;
pub mod runtime;
pub mod store;
pub mod summary;
pub mod window;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use logging::{init_tracing, WindowLogger};
pub use recorder::{ResponseRecorder, StoreRecorder};
pub use runtime::{ControlCommand, FusionRuntime, PresentationFrame, SampleSender};
pub use store::{EventStore, InMemoryEventStore};
pub use summary::{summarize_period, PeriodSummary};
pub use window::{AbsencePolicy, EdgeOutcomeMap, ResponseWindow, WindowConfig, WindowResolution};
