//! Error types for the reid engine.

use thiserror::Error;

use crate::types::{EntityId, Pair};

/// Result type alias using reid's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for reid operations.
///
/// Consistency conditions (contradicting edges) are deliberately absent:
/// they are derived graph state surfaced through the normal query
/// interface, not failures.
#[derive(Error, Debug)]
pub enum Error {
    /// An edge operation referenced an entity the graph does not know.
    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// An entity id was added twice.
    #[error("Duplicate entity: {0}")]
    DuplicateEntity(EntityId),

    /// A feedback payload was malformed (bad decision value, unknown
    /// entities, self-pair). The graph is left unmodified.
    #[error("Invalid feedback for {pair}: {reason}")]
    InvalidFeedback { pair: Pair, reason: String },

    /// A session command arrived before `start`.
    #[error("Session not started")]
    NotStarted,

    /// `start` was issued on a session that is already running.
    #[error("Session already started")]
    AlreadyStarted,

    /// The actor received a payload without a recognized action.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// The external score/decision oracle failed.
    #[error("Oracle error: {0}")]
    Oracle(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O operation failed (review log persistence).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (programming-contract violation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
