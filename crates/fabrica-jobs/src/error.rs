use thiserror::Error;

use crate::types::{JobState, QueueName};

/// Errors from broker and tracker operations.
///
/// `NotFound` is the only condition meant to reach API callers; storage and
/// state errors surface from the specific operation that hit them, while the
/// read-only inspection paths degrade to zeroed/empty values instead.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {queue}/{id}")]
    NotFound { queue: QueueName, id: String },

    #[error("Job {queue}/{id} is in state {state}, expected {expected}")]
    InvalidState {
        queue: QueueName,
        id: String,
        state: JobState,
        expected: JobState,
    },

    #[error("State {0} is not terminal; only completed and failed jobs can be cleaned")]
    NotTerminal(JobState),

    #[error("Broker is shutting down")]
    ShuttingDown,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl JobError {
    /// Create a new NotFound error
    pub fn not_found(queue: QueueName, id: impl Into<String>) -> Self {
        Self::NotFound {
            queue,
            id: id.into(),
        }
    }

    /// Create a new Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

impl From<redis::RedisError> for JobError {
    fn from(e: redis::RedisError) -> Self {
        Self::Storage(e.to_string())
    }
}

/// Convenience result type for job operations
pub type Result<T> = std::result::Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = JobError::not_found(QueueName::Email, "abc-123");
        assert_eq!(err.to_string(), "Job not found: email/abc-123");
    }

    #[test]
    fn test_not_terminal_message() {
        let err = JobError::NotTerminal(JobState::Waiting);
        assert!(err.to_string().contains("not terminal"));
    }
}
