//! Domain errors for the diligence pipeline.

use thiserror::Error;
use uuid::Uuid;

use super::models::JobId;

/// Domain-level errors that can occur in the pipeline.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Job not found: {id} in queue {queue}")]
    JobNotFound { queue: String, id: JobId },

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition { from: String, to: String, reason: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Evidence unavailable for scan request {scan_request_id}: {reason}")]
    EvidenceUnavailable { scan_request_id: Uuid, reason: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

/// Outcome of a job handler that did not produce a result.
///
/// Transient failures are retried under the queue's backoff policy until the
/// job runs out of attempts. Unrecoverable failures skip the remaining attempts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("{0}")]
    Transient(String),

    #[error("{0}")]
    Unrecoverable(String),
}

impl JobError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Transient(reason) | Self::Unrecoverable(reason) => reason,
        }
    }
}

impl From<DomainError> for JobError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::ValidationFailed(_) | DomainError::SerializationError(_) => {
                JobError::Unrecoverable(err.to_string())
            }
            _ => JobError::Transient(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_retryability() {
        assert!(JobError::Transient("timeout".to_string()).is_retryable());
        assert!(!JobError::Unrecoverable("bad payload".to_string()).is_retryable());
    }

    #[test]
    fn test_domain_error_maps_to_job_error() {
        let err: JobError = DomainError::DatabaseError("locked".to_string()).into();
        assert!(err.is_retryable());

        let err: JobError = DomainError::SerializationError("eof".to_string()).into();
        assert!(!err.is_retryable());
        assert_eq!(err.reason(), "Serialization error: eof");
    }
}
