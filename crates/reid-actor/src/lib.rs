//! # reid-actor
//!
//! The asynchronous mailbox shell around one reid session. Commands are
//! JSON objects with an `action` key, posted through a [`GraphClient`]
//! and drained strictly in arrival order by a single consumer task, so
//! the engine itself never needs a lock.
//!
//! Each session (dataset/species) gets its own actor; scaling is by
//! session-level parallelism, not intra-session threading.

pub mod actor;
pub mod protocol;

pub use actor::{GraphActor, GraphClient, ScorerFactory};
