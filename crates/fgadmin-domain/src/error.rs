//! Domain error types for the fan-out engine.

use thiserror::Error;

/// Errors raised by the worker pool.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The queue stayed full for longer than the configured submit timeout.
    #[error("worker pool saturated: job not accepted after {waited_ms}ms")]
    Saturated { waited_ms: u64 },

    /// The pool has been shut down.
    #[error("worker pool is closed")]
    Closed,

    /// The job panicked; the worker recovered and kept running.
    #[error("job panicked: {message}")]
    TaskPanicked { message: String },

    /// The job was dropped before it produced a result.
    #[error("job dropped before completion")]
    Dropped,
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors decoding a multiplexed page token.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenDecodeError {
    #[error("page token is not valid base64: {message}")]
    Base64 { message: String },

    #[error("page token is not a cursor map: {message}")]
    Json { message: String },
}

/// Domain-specific errors for identifiers and permissions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// A permission URN is not in `relation::object` form.
    #[error("invalid permission '{value}': expected relation::type:id")]
    InvalidPermission { value: String },

    /// Unknown partition tag.
    #[error("unknown partition '{value}'")]
    UnknownPartition { value: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
