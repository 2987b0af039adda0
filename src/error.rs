//! Public error type.
//!
//! The engine's internal errors are wrapped into a small stable surface:
//! conflicts are retryable, invalid input is not, and absence of a key is
//! never an error (it is a `None` value).

use thiserror::Error;

/// All tinyfdb errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// A write-write race with a concurrent transaction. Retrying the
    /// whole transaction (see [`crate::Database::transact`]) will likely
    /// succeed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A key or range argument was not a valid packed tuple.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A bug or invariant violation surfaced as an error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for tinyfdb operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether re-running the transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Whether this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Whether this reports malformed input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidKey(_))
    }
}

impl From<tinyfdb_engine::Error> for Error {
    fn from(e: tinyfdb_engine::Error) -> Self {
        use tinyfdb_engine::Error as EngineError;
        match e {
            EngineError::WriteRace { key } => Error::Conflict(format!("write race for key {key}")),
            EngineError::InvalidKey(err) => Error::InvalidKey(err.to_string()),
            EngineError::NotActive => Error::Internal("transaction is no longer active".into()),
        }
    }
}

impl From<tinyfdb_tuple::TupleError> for Error {
    fn from(e: tinyfdb_tuple::TupleError) -> Self {
        Error::InvalidKey(e.to_string())
    }
}
