//! Shared data models for the AdReel backend.
//!
//! This crate provides Serde-serializable types for:
//! - Projects (the aggregate root) and their workflow state
//! - Narration segments and planning constraints
//! - Clip assets and scene assignments (the Scene List)
//! - Render specs and packaged render jobs
//! - Batch jobs and the external job state vocabulary

pub mod batch;
pub mod clip;
pub mod error;
pub mod project;
pub mod render;
pub mod segment;

// Re-export common types
pub use batch::{BatchJob, BatchJobState};
pub use clip::{timeline_gaps, ClipAsset, ClipSlot, SceneAssignment};
pub use error::{ModelError, ModelResult};
pub use project::{Project, ProjectId, ProjectStatus, StepPayload, WorkflowStep};
pub use render::{
    OutputFormat, PackagedRender, RenderInput, RenderOptions, RenderSegment, RenderSpec,
    SubtitleCue, SubtitleOptions, SubtitleSettings, WatermarkOptions, WatermarkSettings,
};
pub use segment::{Segment, SegmentConstraints};
