//! Project handlers.
//!
//! Each handler maps one orchestrator operation onto a JSON route. The
//! project id in the path is the only state a client needs to resume.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use adreel_models::{Project, ProjectId, RenderOptions, SegmentConstraints, StepPayload, WorkflowStep};
use adreel_orchestrator::MatchStrategy;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlanSegmentsRequest {
    #[validate(length(min = 1, max = 20000))]
    pub script: String,
    /// Overrides the server's default constraints
    #[serde(default)]
    pub constraints: Option<SegmentConstraints>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchClipsRequest {
    #[serde(default)]
    pub strategy: MatchStrategy,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OverrideClipRequest {
    #[validate(length(min = 1, max = 256))]
    pub clip_id: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct VoiceoverRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 64))]
    pub voice: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceWorkflowRequest {
    pub step: WorkflowStep,
    #[serde(default)]
    pub payload: StepPayload,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub done: bool,
    pub project: Project,
}

#[derive(Debug, Serialize)]
pub struct OutputResponse {
    pub output_location: String,
}

fn project_id(raw: String) -> ProjectId {
    ProjectId::from_string(raw)
}

/// Create an empty project.
pub async fn create_project(
    State(state): State<AppState>,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    request.validate()?;
    let project = state
        .orchestrator
        .create_project(&request.user_id, &request.title)
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Project>> {
    let project = state.orchestrator.get_project(&project_id(id)).await?;
    Ok(Json(project))
}

/// Split a script into timed segments.
pub async fn plan_segments(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PlanSegmentsRequest>,
) -> ApiResult<Json<Project>> {
    request.validate()?;
    let project = state
        .orchestrator
        .plan_segments(&project_id(id), &request.script, request.constraints)
        .await?;
    Ok(Json(project))
}

/// Assign library clips to the planned segments.
///
/// A body is optional; the tag strategy is used when none is given.
pub async fn match_clips(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Option<Json<MatchClipsRequest>>,
) -> ApiResult<Json<Project>> {
    let Json(request) = request.unwrap_or_default();
    let project = state
        .orchestrator
        .match_clips(&project_id(id), request.strategy)
        .await?;
    Ok(Json(project))
}

pub async fn override_clip(
    State(state): State<AppState>,
    Path((id, segment_id, slot)): Path<(String, String, usize)>,
    Json(request): Json<OverrideClipRequest>,
) -> ApiResult<Json<Project>> {
    request.validate()?;
    let project = state
        .orchestrator
        .override_clip(&project_id(id), &segment_id, slot, &request.clip_id)
        .await?;
    Ok(Json(project))
}

pub async fn synthesize_voiceover(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Option<Json<VoiceoverRequest>>,
) -> ApiResult<Json<Project>> {
    let Json(request) = request.unwrap_or_default();
    request.validate()?;
    let project = state
        .orchestrator
        .synthesize_voiceover(&project_id(id), request.voice.as_deref())
        .await?;
    Ok(Json(project))
}

/// Package the scene list into a render job.
pub async fn package_render(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Option<Json<RenderOptions>>,
) -> ApiResult<Json<Project>> {
    let Json(options) = request.unwrap_or_default();
    let project = state
        .orchestrator
        .package_render_job(&project_id(id), &options)
        .await?;
    Ok(Json(project))
}

pub async fn dispatch_render(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let project = state.orchestrator.dispatch(&project_id(id)).await?;
    Ok((StatusCode::ACCEPTED, Json(project)))
}

/// Look up the render job once.
pub async fn poll_render(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PollResponse>> {
    let (project, done) = state.orchestrator.poll_status(&project_id(id)).await?;
    Ok(Json(PollResponse { done, project }))
}

pub async fn get_output(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OutputResponse>> {
    let output_location = state.orchestrator.render_output(&project_id(id)).await?;
    Ok(Json(OutputResponse { output_location }))
}

/// Move between the editing steps, saving step data on the way.
pub async fn advance_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AdvanceWorkflowRequest>,
) -> ApiResult<Json<Project>> {
    let project = state
        .orchestrator
        .advance_workflow(&project_id(id), request.step, &request.payload)
        .await?;
    Ok(Json(project))
}
