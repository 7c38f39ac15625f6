//! Workflow state machine.
//!
//! Steps run `voiceover → matching → editing → processing → completed`.
//! Users move between the pre-processing steps with [`advance`]; only a
//! dispatch enters `processing` and only a successful poll enters
//! `completed`.

use std::collections::HashSet;

use adreel_models::{
    timeline_gaps, BatchJob, BatchJobState, Project, ProjectStatus, SceneAssignment, Segment,
    StepPayload, WorkflowStep,
};
use adreel_storage::keys::validate_key;

use crate::error::{OrchestratorError, OrchestratorResult};

const TIMELINE_TOLERANCE: f64 = 1e-6;

/// Check that `project` may move to `target`.
pub fn check_transition(project: &Project, target: WorkflowStep) -> OrchestratorResult<()> {
    let current = project.workflow_step;
    if !target.is_pre_processing() {
        return Err(OrchestratorError::invalid_transition(format!(
            "{} is entered by the render pipeline, not by request",
            target
        )));
    }
    if project.status == ProjectStatus::Processing {
        return Err(OrchestratorError::invalid_transition(
            "cannot change steps while a render is in progress",
        ));
    }

    let allowed = target == current
        || current.next() == Some(target)
        || target.ordinal() < current.ordinal();
    if !allowed {
        return Err(OrchestratorError::step_transition(current, target));
    }
    Ok(())
}

/// Move to `target` and apply `payload`.
///
/// Moving back discards any render state. Applying the same step and payload
/// twice leaves the project exactly as after the first call.
pub fn advance(
    project: &mut Project,
    target: WorkflowStep,
    payload: &StepPayload,
) -> OrchestratorResult<()> {
    check_transition(project, target)?;

    let mut next = project.clone();
    if target.ordinal() < next.workflow_step.ordinal() {
        reset_render(&mut next);
    }
    next.workflow_step = target;
    apply_payload(&mut next, payload)?;

    let content_changed = next.segments != project.segments
        || next.scene_assignments != project.scene_assignments
        || next.voiceover_key != project.voiceover_key;
    if content_changed {
        next.packaged = None;
    }

    *project = next;
    Ok(())
}

fn apply_payload(project: &mut Project, payload: &StepPayload) -> OrchestratorResult<()> {
    if let Some(title) = &payload.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(OrchestratorError::invalid_input("title cannot be empty"));
        }
        project.title = title.to_string();
    }
    if let Some(segments) = &payload.segments {
        validate_segments(segments)?;
        if *segments != project.segments && payload.scene_assignments.is_none() {
            project.scene_assignments.clear();
        }
        project.segments = segments.clone();
    }
    if let Some(assignments) = &payload.scene_assignments {
        validate_assignments(assignments, &project.segments)?;
        project.scene_assignments = assignments.clone();
    }
    if let Some(key) = &payload.voiceover_key {
        validate_key(key).map_err(|e| OrchestratorError::invalid_input(e.to_string()))?;
        project.voiceover_key = Some(key.clone());
    }
    Ok(())
}

fn validate_segments(segments: &[Segment]) -> OrchestratorResult<()> {
    let mut ids = HashSet::new();
    for segment in segments {
        if segment.id.trim().is_empty() || !ids.insert(segment.id.as_str()) {
            return Err(OrchestratorError::invalid_input(format!(
                "segment id '{}' is empty or repeated",
                segment.id
            )));
        }
        if segment.text.trim().is_empty() {
            return Err(OrchestratorError::invalid_input(format!(
                "segment {} has no text",
                segment.id
            )));
        }
        if !segment.duration_seconds.is_finite() || segment.duration_seconds <= 0.0 {
            return Err(OrchestratorError::invalid_input(format!(
                "segment {} has invalid duration",
                segment.id
            )));
        }
    }
    Ok(())
}

/// One scene per segment, in segment order, forming a gap-free timeline.
fn validate_assignments(
    assignments: &[SceneAssignment],
    segments: &[Segment],
) -> OrchestratorResult<()> {
    if assignments.len() != segments.len() {
        return Err(OrchestratorError::invalid_input(format!(
            "scene list has {} scenes for {} segments",
            assignments.len(),
            segments.len()
        )));
    }
    for (assignment, segment) in assignments.iter().zip(segments) {
        if assignment.segment_id != segment.id {
            return Err(OrchestratorError::invalid_input(format!(
                "scene references segment {} where {} was expected",
                assignment.segment_id, segment.id
            )));
        }
        if assignment.clips.is_empty() {
            return Err(OrchestratorError::invalid_input(format!(
                "scene for {} has no clips",
                assignment.segment_id
            )));
        }
        let bad_slot = assignment.clips.iter().any(|slot| {
            slot.clip_id.trim().is_empty()
                || !slot.duration_seconds.is_finite()
                || slot.duration_seconds <= 0.0
        });
        if bad_slot {
            return Err(OrchestratorError::invalid_input(format!(
                "scene for {} has an invalid clip slot",
                assignment.segment_id
            )));
        }
        if !assignment.start_position_seconds.is_finite() || assignment.start_position_seconds < 0.0 {
            return Err(OrchestratorError::invalid_input(format!(
                "scene for {} has an invalid start position",
                assignment.segment_id
            )));
        }
    }
    if let Some(&index) = timeline_gaps(assignments, TIMELINE_TOLERANCE).first() {
        return Err(OrchestratorError::invalid_input(format!(
            "scene for {} does not start where the previous one ends",
            assignments[index].segment_id
        )));
    }
    Ok(())
}

/// Forget everything about previous renders.
pub fn reset_render(project: &mut Project) {
    project.batch_job = None;
    project.batch_state = None;
    project.packaged = None;
    project.output_location = None;
    project.error = None;
    project.progress = 0;
    project.status = ProjectStatus::Pending;
}

/// Record an accepted submission.
pub fn mark_dispatched(project: &mut Project, job: BatchJob) {
    project.batch_job = Some(job);
    project.batch_state = Some(BatchJobState::Submitted);
    project.workflow_step = WorkflowStep::Processing;
    project.status = ProjectStatus::Processing;
    project.progress = 0;
    project.output_location = None;
    project.error = None;
}

pub fn complete(project: &mut Project, output_location: String) {
    project.workflow_step = WorkflowStep::Completed;
    project.status = ProjectStatus::Completed;
    project.batch_state = Some(BatchJobState::Succeeded);
    project.output_location = Some(output_location);
    project.progress = 100;
    project.error = None;
}

pub fn fail(project: &mut Project, reason: String) {
    project.status = ProjectStatus::Failed;
    project.batch_state = Some(BatchJobState::Failed);
    project.error = Some(reason);
}

/// Store the latest observed state. Progress only moves forward.
pub fn record_progress(project: &mut Project, state: BatchJobState, progress: u8) {
    project.batch_state = Some(state);
    project.progress = progress.max(project.progress).min(100);
}

#[cfg(test)]
mod tests {
    use super::*;
    use adreel_models::ClipSlot;
    use chrono::Utc;

    fn segments() -> Vec<Segment> {
        vec![
            Segment::new("seg-1", "Buy our coffee.", 2.0, vec!["coffee".into()]),
            Segment::new("seg-2", "It's fresh every morning.", 2.5, vec!["morning".into()]),
        ]
    }

    fn job() -> BatchJob {
        BatchJob {
            external_job_id: "job-1".to_string(),
            external_job_name: "ad-render-20260101000000-deadbeef".to_string(),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_forward_one_step_only() {
        let mut project = Project::new("u1", "t");
        assert!(advance(&mut project, WorkflowStep::Matching, &StepPayload::default()).is_ok());
        assert_eq!(project.workflow_step, WorkflowStep::Matching);

        let mut fresh = Project::new("u1", "t");
        let err = advance(&mut fresh, WorkflowStep::Editing, &StepPayload::default()).unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidTransition(_)));
        assert_eq!(fresh.workflow_step, WorkflowStep::Voiceover);
    }

    #[test]
    fn test_processing_and_completed_not_requestable() {
        let mut project = Project::new("u1", "t");
        project.workflow_step = WorkflowStep::Editing;
        for target in [WorkflowStep::Processing, WorkflowStep::Completed] {
            let result = advance(&mut project, target, &StepPayload::default());
            assert!(matches!(result, Err(OrchestratorError::InvalidTransition(_))));
        }
    }

    #[test]
    fn test_same_payload_twice_equals_once() {
        let payload = StepPayload {
            segments: Some(segments()),
            ..Default::default()
        };
        let mut project = Project::new("u1", "t");
        advance(&mut project, WorkflowStep::Matching, &payload).unwrap();
        let once = project.clone();
        advance(&mut project, WorkflowStep::Matching, &payload).unwrap();
        assert_eq!(project, once);
    }

    #[test]
    fn test_moving_back_clears_render_state() {
        let mut project = Project::new("u1", "t");
        project.workflow_step = WorkflowStep::Editing;
        mark_dispatched(&mut project, job());
        complete(&mut project, "u1/p/renders/r.mp4".to_string());
        assert!(project.invariant_violation().is_none());

        advance(&mut project, WorkflowStep::Editing, &StepPayload::default()).unwrap();
        assert_eq!(project.workflow_step, WorkflowStep::Editing);
        assert_eq!(project.status, ProjectStatus::Pending);
        assert!(project.batch_job.is_none());
        assert!(project.output_location.is_none());
        assert_eq!(project.progress, 0);
        assert!(project.invariant_violation().is_none());
    }

    #[test]
    fn test_no_step_changes_while_rendering() {
        let mut project = Project::new("u1", "t");
        project.workflow_step = WorkflowStep::Editing;
        mark_dispatched(&mut project, job());
        let result = advance(&mut project, WorkflowStep::Editing, &StepPayload::default());
        assert!(matches!(result, Err(OrchestratorError::InvalidTransition(_))));
        assert_eq!(project.status, ProjectStatus::Processing);
    }

    #[test]
    fn test_failed_render_can_go_back() {
        let mut project = Project::new("u1", "t");
        project.workflow_step = WorkflowStep::Editing;
        mark_dispatched(&mut project, job());
        fail(&mut project, "Render job failed".to_string());
        assert!(project.invariant_violation().is_none());

        advance(&mut project, WorkflowStep::Matching, &StepPayload::default()).unwrap();
        assert_eq!(project.status, ProjectStatus::Pending);
        assert!(project.error.is_none());
    }

    #[test]
    fn test_scene_payload_must_reference_segments() {
        let mut project = Project::new("u1", "t");
        project.segments = segments();
        project.workflow_step = WorkflowStep::Matching;
        let payload = StepPayload {
            scene_assignments: Some(vec![SceneAssignment {
                segment_id: "seg-9".to_string(),
                clips: vec![ClipSlot {
                    clip_id: "a".to_string(),
                    duration_seconds: 1.0,
                }],
                start_position_seconds: 0.0,
            }]),
            ..Default::default()
        };
        let result = advance(&mut project, WorkflowStep::Editing, &payload);
        assert!(matches!(result, Err(OrchestratorError::InvalidInput(_))));
        assert_eq!(project.workflow_step, WorkflowStep::Matching);
    }

    fn scene(segment_id: &str, start: f64, duration: f64) -> SceneAssignment {
        SceneAssignment {
            segment_id: segment_id.to_string(),
            clips: vec![ClipSlot {
                clip_id: "pour".to_string(),
                duration_seconds: duration,
            }],
            start_position_seconds: start,
        }
    }

    #[test]
    fn test_new_segments_drop_stale_scenes() {
        let mut project = Project::new("u1", "t");
        project.segments = segments();
        project.scene_assignments = vec![scene("seg-1", 0.0, 2.0), scene("seg-2", 2.0, 2.5)];
        project.workflow_step = WorkflowStep::Editing;

        let payload = StepPayload {
            segments: Some(vec![Segment::new("new-1", "Brand new line.", 3.0, vec![])]),
            ..Default::default()
        };
        advance(&mut project, WorkflowStep::Editing, &payload).unwrap();
        assert_eq!(project.segments[0].id, "new-1");
        assert!(project.scene_assignments.is_empty());
    }

    #[test]
    fn test_same_segments_keep_scenes() {
        let mut project = Project::new("u1", "t");
        project.segments = segments();
        project.scene_assignments = vec![scene("seg-1", 0.0, 2.0), scene("seg-2", 2.0, 2.5)];
        project.workflow_step = WorkflowStep::Editing;

        let payload = StepPayload {
            segments: Some(segments()),
            ..Default::default()
        };
        advance(&mut project, WorkflowStep::Editing, &payload).unwrap();
        assert_eq!(project.scene_assignments.len(), 2);
    }

    #[test]
    fn test_scene_payload_must_cover_segments_in_order_without_gaps() {
        let mut project = Project::new("u1", "t");
        project.segments = segments();
        project.workflow_step = WorkflowStep::Matching;

        let rejected = [
            vec![scene("seg-1", 0.0, 2.0)],
            vec![scene("seg-2", 0.0, 2.5), scene("seg-1", 2.5, 2.0)],
            vec![scene("seg-1", 0.0, 2.0), scene("seg-2", 3.0, 2.5)],
        ];
        for scenes in rejected {
            let payload = StepPayload {
                scene_assignments: Some(scenes),
                ..Default::default()
            };
            let result = advance(&mut project, WorkflowStep::Editing, &payload);
            assert!(matches!(result, Err(OrchestratorError::InvalidInput(_))));
            assert!(project.scene_assignments.is_empty());
        }

        let payload = StepPayload {
            scene_assignments: Some(vec![scene("seg-1", 0.0, 2.0), scene("seg-2", 2.0, 2.5)]),
            ..Default::default()
        };
        advance(&mut project, WorkflowStep::Editing, &payload).unwrap();
        assert_eq!(project.scene_assignments.len(), 2);
        assert_eq!(project.workflow_step, WorkflowStep::Editing);
    }

    #[test]
    fn test_record_progress_is_monotonic() {
        let mut project = Project::new("u1", "t");
        record_progress(&mut project, BatchJobState::Running, 60);
        record_progress(&mut project, BatchJobState::Running, 30);
        assert_eq!(project.progress, 60);
        assert_eq!(project.batch_state, Some(BatchJobState::Running));
    }
}
