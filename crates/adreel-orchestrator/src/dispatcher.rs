//! Batch job submission and status polling.

use std::collections::BTreeMap;

use chrono::Utc;

use adreel_batch::{
    job_name, merge_parameters, pack_parameters, progress_for, BatchService, SubmitRequest,
};
use adreel_models::{BatchJob, BatchJobState, PackagedRender, Project, ProjectStatus, RenderInput};

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::logging::ProjectLogger;
use crate::metrics::{record_dropped_params, record_poll_lookup_failure};
use crate::workflow;

/// Reason recorded when the batch service gives none.
pub const DEFAULT_FAILURE_REASON: &str = "Render job failed";

/// Parameters every render job carries. These always override extras.
pub fn required_parameters(
    project: &Project,
    packaged: &PackagedRender,
    job_type: &str,
) -> OrchestratorResult<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    params.insert("JOB_TYPE".to_string(), job_type.to_string());
    params.insert("USER_ID".to_string(), project.user_id.clone());
    params.insert("PROJECT_ID".to_string(), project.id.to_string());
    params.insert("RUN_ID".to_string(), packaged.run_id.clone());
    params.insert("OUTPUT_KEY".to_string(), packaged.output_location.clone());
    match &packaged.input {
        RenderInput::Inline { spec } => {
            let json = serde_json::to_string(spec).map_err(|e| {
                OrchestratorError::invalid_input(format!("render spec not serializable: {}", e))
            })?;
            params.insert("RENDER_SPEC".to_string(), json);
        }
        RenderInput::Spilled { key } => {
            params.insert("RENDER_SPEC_KEY".to_string(), key.clone());
        }
    }
    Ok(params)
}

/// Submit the packaged render for `project`.
///
/// On success the returned project is in `processing` with a new batch job;
/// on rejection the input project is left untouched.
pub async fn dispatch(
    batch: &dyn BatchService,
    project: &Project,
    config: &OrchestratorConfig,
) -> OrchestratorResult<Project> {
    if project.status == ProjectStatus::Processing {
        return Err(OrchestratorError::invalid_transition(
            "a render job is already in progress",
        ));
    }
    let packaged = project.packaged.as_ref().ok_or_else(|| {
        OrchestratorError::invalid_transition("project has not been packaged for rendering")
    })?;

    let logger = ProjectLogger::new(&project.id, "dispatch");
    let required = required_parameters(project, packaged, &config.job_type)?;
    let merged = merge_parameters(&packaged.extra_params, required);
    let packed = pack_parameters(merged, config.max_param_bytes);
    if !packed.dropped.is_empty() {
        record_dropped_params(packed.dropped.len());
        logger.log_warning(&format!(
            "dropped parameters to fit budget: {}",
            packed.dropped.join(", ")
        ));
    }

    let now = Utc::now();
    let request = SubmitRequest {
        job_name: job_name(&config.job_type, now),
        parameters: packed.parameters,
    };
    logger.log_start(&format!("submitting {}", request.job_name));

    let submitted = batch
        .submit(request)
        .await
        .map_err(|e| OrchestratorError::dispatch_failed(e.to_string()))?;

    let logger = logger.with_job(submitted.job_id.clone());
    logger.log_completion("render job accepted");

    let mut next = project.clone();
    workflow::mark_dispatched(
        &mut next,
        BatchJob {
            external_job_id: submitted.job_id,
            external_job_name: submitted.job_name,
            submitted_at: now,
        },
    );
    Ok(next)
}

/// Outcome of one status lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub project: Project,
    /// The job reached a terminal state
    pub done: bool,
    /// The project differs from the input and must be saved
    pub changed: bool,
}

/// Look up the job once and fold the answer into the project.
///
/// A failed lookup is transient: the project comes back unchanged with
/// `done = false`.
pub async fn poll(
    batch: &dyn BatchService,
    project: &Project,
    config: &OrchestratorConfig,
) -> OrchestratorResult<PollOutcome> {
    let job = project.batch_job.as_ref().ok_or_else(|| {
        OrchestratorError::invalid_transition("no render job has been dispatched")
    })?;

    if project.status.is_terminal() {
        return Ok(PollOutcome {
            project: project.clone(),
            done: true,
            changed: false,
        });
    }

    let logger = ProjectLogger::new(&project.id, "poll").with_job(job.external_job_id.clone());
    let description = match batch.describe(&job.external_job_id).await {
        Ok(description) => description,
        Err(e) => {
            record_poll_lookup_failure();
            logger.log_warning(&format!("status lookup failed: {}", e));
            return Ok(PollOutcome {
                project: project.clone(),
                done: false,
                changed: false,
            });
        }
    };

    let progress = progress_for(
        &description,
        Utc::now(),
        config.expected_render_time,
        project.progress,
    );

    let mut next = project.clone();
    let done = match description.state {
        BatchJobState::Succeeded => {
            let output = project
                .packaged
                .as_ref()
                .map(|p| p.output_location.clone())
                .ok_or_else(|| {
                    OrchestratorError::invalid_transition("succeeded job has no packaged output")
                })?;
            workflow::complete(&mut next, output);
            logger.log_completion("render succeeded");
            true
        }
        BatchJobState::Failed => {
            let reason = description
                .reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string());
            logger.log_error(&reason);
            workflow::fail(&mut next, reason);
            true
        }
        state => {
            workflow::record_progress(&mut next, state, progress);
            logger.log_progress(&format!("{} at {}%", state, progress));
            false
        }
    };

    let changed = next != *project;
    Ok(PollOutcome {
        project: next,
        done,
        changed,
    })
}
