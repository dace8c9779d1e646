//! Service error types.

use fgadmin_domain::{DomainError, PartitionFailures, PoolError};
use fgadmin_storage::StoreError;
use thiserror::Error;

/// Errors returned by the group and role services.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// A request argument was rejected before any store call.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// One or more partitions failed; the others completed.
    #[error("{0}")]
    PartialFailure(PartitionFailures),

    /// A single store call failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The worker pool rejected a job.
    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        ServiceError::Validation {
            message: err.to_string(),
        }
    }
}

impl ServiceError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::Validation { .. })
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use fgadmin_domain::{FailureKind, PartitionFailure};

    #[test]
    fn test_partial_failure_renders_every_partition() {
        let mut failures = PartitionFailures::new();
        failures.push(PartitionFailure {
            partition: "role".to_string(),
            kind: FailureKind::Read,
            message: "store operation 'read_tuples' timeout after 50ms".to_string(),
        });
        failures.push(PartitionFailure {
            partition: "member".to_string(),
            kind: FailureKind::Write,
            message: "store unavailable: connection reset".to_string(),
        });

        let err = ServiceError::PartialFailure(failures);
        assert_eq!(
            err.to_string(),
            "partition 'role' read failed: store operation 'read_tuples' timeout after 50ms; \
             partition 'member' write failed: store unavailable: connection reset"
        );
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_domain_errors_become_validation_errors() {
        let err: ServiceError = DomainError::InvalidPermission {
            value: "edit".to_string(),
        }
        .into();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("edit"));
    }
}
