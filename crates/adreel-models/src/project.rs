//! Project aggregate and workflow vocabulary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::batch::{BatchJob, BatchJobState};
use crate::clip::SceneAssignment;
use crate::error::ModelError;
use crate::render::PackagedRender;
use crate::segment::Segment;

/// Unique identifier for a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    /// Generate a new random project ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Overall project status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Being edited, nothing submitted
    #[default]
    Pending,
    /// Render job submitted and not yet finished
    Processing,
    /// Rendered video available at `output_location`
    Completed,
    /// Render failed; reason in `error`
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Processing => "processing",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Failed)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse phase of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    #[default]
    Voiceover,
    Matching,
    Editing,
    Processing,
    Completed,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 5] = [
        WorkflowStep::Voiceover,
        WorkflowStep::Matching,
        WorkflowStep::Editing,
        WorkflowStep::Processing,
        WorkflowStep::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::Voiceover => "voiceover",
            WorkflowStep::Matching => "matching",
            WorkflowStep::Editing => "editing",
            WorkflowStep::Processing => "processing",
            WorkflowStep::Completed => "completed",
        }
    }

    /// Position in the linear step order.
    pub fn ordinal(&self) -> usize {
        match self {
            WorkflowStep::Voiceover => 0,
            WorkflowStep::Matching => 1,
            WorkflowStep::Editing => 2,
            WorkflowStep::Processing => 3,
            WorkflowStep::Completed => 4,
        }
    }

    /// Steps a user may edit freely before a render is submitted.
    pub fn is_pre_processing(&self) -> bool {
        matches!(
            self,
            WorkflowStep::Voiceover | WorkflowStep::Matching | WorkflowStep::Editing
        )
    }

    pub fn next(&self) -> Option<WorkflowStep> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WorkflowStep {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|step| step.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| ModelError::UnknownStep(s.to_string()))
    }
}

/// Step-specific data saved together with a workflow transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<Segment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_assignments: Option<Vec<SceneAssignment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voiceover_key: Option<String>,
}

impl StepPayload {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.segments.is_none()
            && self.scene_assignments.is_none()
            && self.voiceover_key.is_none()
    }
}

/// One ad being assembled; the aggregate root for all orchestrator state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Project {
    pub id: ProjectId,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub workflow_step: WorkflowStep,
    #[serde(default)]
    pub status: ProjectStatus,

    /// Narration script used for the last planning run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Object store key of the synthesized narration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voiceover_key: Option<String>,

    #[serde(default)]
    pub segments: Vec<Segment>,
    /// The Scene List, one assignment per segment
    #[serde(default)]
    pub scene_assignments: Vec<SceneAssignment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaged: Option<PackagedRender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_job: Option<BatchJob>,
    /// Last external state observed while polling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_state: Option<BatchJobState>,
    /// Render progress percentage (0-100)
    #[serde(default)]
    pub progress: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Write sequence for optimistic concurrency
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            user_id: user_id.into(),
            title: title.into(),
            workflow_step: WorkflowStep::default(),
            status: ProjectStatus::default(),
            script: None,
            voiceover_key: None,
            segments: Vec::new(),
            scene_assignments: Vec::new(),
            packaged: None,
            batch_job: None,
            batch_state: None,
            progress: 0,
            output_location: None,
            error: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Object store key of the spilled render spec, if the last packaging spilled.
    pub fn render_spec_ref(&self) -> Option<&str> {
        self.packaged.as_ref().and_then(|p| p.spilled_key())
    }

    pub fn segment(&self, segment_id: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == segment_id)
    }

    /// Total narration length across all segments.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_seconds).sum()
    }

    /// Replace one slot's clip, keeping its timing untouched.
    pub fn set_slot_clip(
        &mut self,
        segment_id: &str,
        slot: usize,
        clip_id: impl Into<String>,
    ) -> Result<(), ModelError> {
        let assignment = self
            .scene_assignments
            .iter_mut()
            .find(|a| a.segment_id == segment_id)
            .ok_or_else(|| ModelError::SegmentNotFound(segment_id.to_string()))?;
        let slot_ref = assignment
            .clips
            .get_mut(slot)
            .ok_or_else(|| ModelError::SlotOutOfRange {
                segment_id: segment_id.to_string(),
                slot,
            })?;
        slot_ref.clip_id = clip_id.into();
        Ok(())
    }

    /// Describe the first violated status invariant, if any.
    pub fn invariant_violation(&self) -> Option<&'static str> {
        if self.status == ProjectStatus::Completed && self.output_location.is_none() {
            return Some("completed project has no output location");
        }
        if self.status == ProjectStatus::Failed && self.error.is_none() {
            return Some("failed project has no error");
        }
        if self.batch_job.is_some()
            && !matches!(
                self.workflow_step,
                WorkflowStep::Processing | WorkflowStep::Completed
            )
        {
            return Some("batch job recorded outside processing");
        }
        None
    }

    /// Stamp `updated_at` with the current time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
