//! Storage error types.

use thiserror::Error;

/// Tuple store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A tuple or filter failed validation.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A continuation cursor could not be decoded.
    #[error("invalid cursor: {message}")]
    InvalidCursor { message: String },

    /// The store did not answer in time.
    #[error("store operation '{operation}' timeout after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// The store could not be reached.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// The caller gave up before the store answered.
    #[error("store operation '{operation}' cancelled")]
    Cancelled { operation: String },

    /// Internal error.
    #[error("internal store error: {message}")]
    Internal { message: String },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
