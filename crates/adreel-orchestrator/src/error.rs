//! Orchestrator error types.

use thiserror::Error;

use adreel_batch::BatchError;
use adreel_firestore::FirestoreError;
use adreel_models::{ModelError, WorkflowStep};
use adreel_storage::StorageError;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Segment planning failed: {0}")]
    PlanningFailed(String),

    #[error("No clip assets available for matching")]
    NoAssetsAvailable,

    #[error("Render job parameters need {size} bytes, limit is {limit}")]
    PackagingSizeExceeded { size: usize, limit: usize },

    #[error("Dispatch failed: {0}")]
    DispatchFailed(String),

    #[error("Render job failed: {0}")]
    JobFailed(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown clip: {0}")]
    UnknownClip(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Narration synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Document store error: {0}")]
    Store(FirestoreError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),
}

impl OrchestratorError {
    pub fn planning_failed(msg: impl Into<String>) -> Self {
        Self::PlanningFailed(msg.into())
    }

    pub fn dispatch_failed(msg: impl Into<String>) -> Self {
        Self::DispatchFailed(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    /// Step change the workflow does not allow.
    pub fn step_transition(from: WorkflowStep, to: WorkflowStep) -> Self {
        Self::InvalidTransition(format!("cannot move from {} to {}", from, to))
    }

    /// Check if the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            OrchestratorError::PlanningFailed(_)
            | OrchestratorError::DispatchFailed(_)
            | OrchestratorError::SynthesisFailed(_)
            | OrchestratorError::Conflict(_) => true,
            OrchestratorError::Storage(e) => e.is_retryable(),
            OrchestratorError::Store(e) => e.is_retryable(),
            OrchestratorError::Batch(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::PlanningFailed(_) => "planning_failed",
            OrchestratorError::NoAssetsAvailable => "no_assets",
            OrchestratorError::PackagingSizeExceeded { .. } => "packaging_size",
            OrchestratorError::DispatchFailed(_) => "dispatch_failed",
            OrchestratorError::JobFailed(_) => "job_failed",
            OrchestratorError::InvalidTransition(_) => "invalid_transition",
            OrchestratorError::InvalidInput(_) => "invalid_input",
            OrchestratorError::NotFound(_) => "not_found",
            OrchestratorError::UnknownClip(_) => "unknown_clip",
            OrchestratorError::Conflict(_) => "conflict",
            OrchestratorError::SynthesisFailed(_) => "synthesis_failed",
            OrchestratorError::Storage(_) => "storage",
            OrchestratorError::Store(_) => "store",
            OrchestratorError::Batch(_) => "batch",
        }
    }
}

// Stale writes surface as Conflict whichever way the store detected them.
impl From<FirestoreError> for OrchestratorError {
    fn from(err: FirestoreError) -> Self {
        if err.is_conflict() || err.is_precondition_failed() {
            OrchestratorError::Conflict(err.to_string())
        } else if let FirestoreError::NotFound(path) = err {
            OrchestratorError::NotFound(path)
        } else {
            OrchestratorError::Store(err)
        }
    }
}

impl From<ModelError> for OrchestratorError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::SegmentNotFound(id) => {
                OrchestratorError::NotFound(format!("segment {}", id))
            }
            other => OrchestratorError::InvalidInput(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conflict_maps_to_conflict() {
        let err: OrchestratorError = FirestoreError::VersionConflict {
            doc_id: "p1".to_string(),
            expected: 2,
            found: 3,
        }
        .into();
        assert!(matches!(err, OrchestratorError::Conflict(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_missing_document_maps_to_not_found() {
        let err: OrchestratorError = FirestoreError::not_found("ad_projects/p1").into();
        assert!(matches!(err, OrchestratorError::NotFound(ref p) if p == "ad_projects/p1"));
    }

    #[test]
    fn test_slot_errors_are_input_errors() {
        let err: OrchestratorError = ModelError::SlotOutOfRange {
            segment_id: "seg-1".to_string(),
            slot: 4,
        }
        .into();
        assert!(matches!(err, OrchestratorError::InvalidInput(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_step_transition_message() {
        let err = OrchestratorError::step_transition(WorkflowStep::Voiceover, WorkflowStep::Editing);
        assert_eq!(
            err.to_string(),
            "Invalid transition: cannot move from voiceover to editing"
        );
        assert_eq!(err.kind(), "invalid_transition");
    }
}
