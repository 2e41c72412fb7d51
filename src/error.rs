//! Error types for the memoization engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Errors raised by cache providers and by value marshaling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Backend rejected or failed a command
    #[error("Backend error: {0}")]
    Backend(String),

    /// Backend could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// Value could not be encoded or a stored payload could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Batched computation returned a result vector of the wrong length
    #[error("Batch length mismatch: expected {expected} results, got {actual}")]
    BatchLength { expected: usize, actual: usize },

    /// Pipeline reply did not match the queued command
    #[error("Unexpected pipeline reply: {0}")]
    UnexpectedReply(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

// == Memoize Error Enum ==
/// Error returned by memoized operations.
///
/// `Rejected` carries the wrapped function's failure exactly as it was
/// produced, whether it was just computed or replayed from the cache.
#[derive(Error, Debug)]
pub enum MemoizeError<E> {
    /// The provider or the marshaling layer failed
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The wrapped function (or the batch override) failed
    #[error("computation rejected")]
    Rejected(E),
}

impl<E> MemoizeError<E> {
    /// Returns the rejection value if this is a computation failure.
    pub fn rejection(&self) -> Option<&E> {
        match self {
            MemoizeError::Rejected(reason) => Some(reason),
            MemoizeError::Cache(_) => None,
        }
    }

    /// Consumes the error, returning the rejection value if present.
    pub fn into_rejection(self) -> Option<E> {
        match self {
            MemoizeError::Rejected(reason) => Some(reason),
            MemoizeError::Cache(_) => None,
        }
    }

    /// Returns true if the failure came from the cache backend.
    pub fn is_cache_error(&self) -> bool {
        matches!(self, MemoizeError::Cache(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for provider operations.
pub type Result<T> = std::result::Result<T, CacheError>;
