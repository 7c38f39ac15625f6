//! LLM client error types.

use thiserror::Error;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The service answered, but not with what was asked for.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl LlmError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            429 | 500..=599 => Self::ServiceUnavailable(format!("HTTP {}: {}", status, body)),
            _ => Self::RequestFailed(format!("HTTP {}: {}", status, body)),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::ServiceUnavailable(_) | LlmError::Network(_))
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, LlmError::MalformedResponse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(LlmError::from_status(503, "busy").is_retryable());
        assert!(LlmError::from_status(429, "slow down").is_retryable());
        assert!(!LlmError::from_status(400, "bad").is_retryable());
        assert!(LlmError::malformed("x").is_malformed());
    }
}
