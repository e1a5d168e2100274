//! # reid-core
//!
//! Core types, traits, and abstractions for the reid identity-inference
//! engine.
//!
//! This crate provides the foundational data structures the other reid
//! crates depend on: entity/pair identifiers, review decisions and
//! confidence ordinals, feedback payloads, the append-only review log,
//! engine parameters, and the shared error type.

pub mod decision;
pub mod defaults;
pub mod error;
pub mod feedback;
pub mod log;
pub mod logging;
pub mod params;
pub mod types;

// Re-export commonly used types at crate root
pub use decision::{Confidence, Decision, UserId};
pub use error::{Error, Result};
pub use feedback::{Feedback, PairStatus, ReviewRecord};
pub use log::ReviewLog;
pub use params::{EngineParams, RedundancyParams, RefreshParams, SimulationParams};
pub use types::{EntityId, NameId, Pair};
