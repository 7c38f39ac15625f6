//! Batch service error types.

use thiserror::Error;

pub type BatchResult<T> = Result<T, BatchError>;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Batch configuration error: {0}")]
    Config(String),

    #[error("Job submission rejected: {0}")]
    SubmitFailed(String),

    #[error("Job status lookup failed: {0}")]
    DescribeFailed(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Unrecognized job state: {0}")]
    UnknownState(String),
}

impl BatchError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn submit_failed(msg: impl Into<String>) -> Self {
        Self::SubmitFailed(msg.into())
    }

    pub fn describe_failed(msg: impl Into<String>) -> Self {
        Self::DescribeFailed(msg.into())
    }

    /// Submission and lookup failures are worth another attempt by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BatchError::SubmitFailed(_) | BatchError::DescribeFailed(_)
        )
    }
}
