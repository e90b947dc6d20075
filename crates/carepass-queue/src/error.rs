//! Queue errors

use carepass_core::effects::{StorageError, TimeError};
use carepass_core::{CarepassError, JobId};

/// Errors raised by queue operations other than delivery
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// Enqueue options that could never produce a deliverable job
    #[error("Invalid enqueue options: {0}")]
    InvalidOptions(String),

    /// No job with this id
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// Record store failure
    #[error("Queue storage failed: {0}")]
    Storage(String),

    /// A stored job could not be encoded or decoded
    #[error("Queue serialization failed: {0}")]
    Serialization(String),

    /// The clock could not be read
    #[error("Clock unavailable: {0}")]
    Clock(String),
}

impl From<StorageError> for QueueError {
    fn from(err: StorageError) -> Self {
        QueueError::Storage(err.to_string())
    }
}

impl From<TimeError> for QueueError {
    fn from(err: TimeError) -> Self {
        QueueError::Clock(err.to_string())
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Serialization(err.to_string())
    }
}

impl From<QueueError> for CarepassError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::InvalidOptions(msg) => CarepassError::invalid(msg),
            QueueError::NotFound(id) => CarepassError::not_found(format!("job {id}")),
            QueueError::Storage(msg) => CarepassError::storage(msg),
            QueueError::Serialization(msg) => CarepassError::serialization(msg),
            QueueError::Clock(msg) => CarepassError::internal(msg),
        }
    }
}

/// A single delivery attempt failed.
///
/// Never escapes a batch: it is recorded in the job's error history and
/// summarized in the batch result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DeliveryError {
    /// Human-readable cause
    pub message: String,
    /// Whether another attempt could succeed
    pub retryable: bool,
}

impl DeliveryError {
    /// A transient failure worth retrying
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// A failure no retry can fix, such as a payload missing required fields
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}
