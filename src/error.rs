//! Error taxonomy shared by every operation.
//!
//! All variants are recovered at the command boundary and turned into a
//! caller-facing reply; nothing here is allowed to cross into an ingress
//! channel as a panic.

use thiserror::Error;

/// Domain errors for authorization, moderation and fleet operations.
#[derive(Debug, Error)]
pub enum WardenError {
    /// A user, bot or record that the operation needs does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The issuer's rank does not permit the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Duplicate add; the state already holds what the caller asked for.
    #[error("{0}")]
    AlreadyExists(String),

    /// Malformed username, missing argument or out-of-range value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Process spawn/terminate or storage I/O failure.
    #[error("external failure: {0}")]
    External(String),
}

impl From<mongodb::error::Error> for WardenError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::External(err.to_string())
    }
}

impl From<std::io::Error> for WardenError {
    fn from(err: std::io::Error) -> Self {
        Self::External(err.to_string())
    }
}

pub type WardenResult<T> = Result<T, WardenError>;
