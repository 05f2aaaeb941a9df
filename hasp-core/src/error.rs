//! Error types for the hasp core library.

use thiserror::Error;

/// Top-level error type for all hasp operations.
///
/// The first four variants are expected, user-facing conditions that the
/// interaction layer turns into deny verdicts; they are never treated as
/// system faults. The remaining variants belong to the storage and
/// configuration layers.
#[derive(Error, Debug)]
pub enum HaspError {
    /// A lock already exists at the target location.
    #[error("Already locked: {location}")]
    AlreadyLocked {
        /// Where the existing lock sits.
        location: crate::Location,
    },

    /// No lock exists at the target location.
    #[error("Not locked: {location}")]
    NotLocked {
        /// The location that was expected to hold a lock.
        location: crate::Location,
    },

    /// The requesting actor lacks permission for the attempted mutation.
    #[error("Not authorized")]
    NotAuthorized,

    /// The owner is at the configured ceiling for this lock type.
    #[error("Lock limit reached for {kind} locks (limit: {limit})")]
    LockLimitReached {
        /// Which lock type hit the limit.
        kind: crate::LockType,
        /// Maximum allowed for one owner.
        limit: u32,
    },

    /// A pending interaction was constructed with contradictory arguments.
    #[error("Invalid interaction: {reason}")]
    InvalidInteraction {
        /// What the caller got wrong.
        reason: String,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, HaspError>;
