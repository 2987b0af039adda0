//! Engine error type.

use thiserror::Error;
use tinyfdb_tuple::TupleError;

/// Errors surfaced by the transaction engine.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Another transaction committed a write to a key this transaction
    /// read or wrote. Retrying the whole transaction will likely succeed.
    #[error("write race for key {key}")]
    WriteRace {
        /// Human-readable rendering of the contested key.
        key: String,
    },

    /// A key argument was not a valid packed tuple.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] TupleError),

    /// The transaction has already committed or been cancelled.
    #[error("transaction is no longer active")]
    NotActive,
}

impl Error {
    /// Whether re-running the transaction can clear the error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::WriteRace { .. })
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
