//! Shared data models for MindBell.
//!
//! This crate provides Serde-serializable types for:
//! - Chime events (one immutable record per response window)
//! - Response outcomes
//! - Practice sessions
//! - Identifier newtypes

pub mod error;
pub mod event;
pub mod session;

// Re-export common types
pub use error::{ModelError, ModelResult};
pub use event::{ChimeEvent, EventId, Outcome};
pub use session::{Session, SessionId};
