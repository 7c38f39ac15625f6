//! Model validation errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Invalid constraints: {0}")]
    InvalidConstraints(String),

    #[error("Unknown workflow step: {0}")]
    UnknownStep(String),

    #[error("Unknown batch job state: {0}")]
    UnknownJobState(String),

    #[error("Segment not found: {0}")]
    SegmentNotFound(String),

    #[error("Clip slot {slot} out of range for segment {segment_id}")]
    SlotOutOfRange { segment_id: String, slot: usize },
}

impl ModelError {
    pub fn invalid_constraints(msg: impl Into<String>) -> Self {
        Self::InvalidConstraints(msg.into())
    }
}
