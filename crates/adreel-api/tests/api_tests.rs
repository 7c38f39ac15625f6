//! HTTP tests against the router with in-memory backing stores.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use adreel_api::{create_router, ApiConfig, AppState, Backend, ReadinessCheck};
use adreel_batch::{BatchResult, BatchService, JobDescription, SubmitRequest, SubmittedJob};
use adreel_firestore::{InMemoryClipLibrary, InMemoryProjectStore};
use adreel_llm_client::{ClipChoice, LlmError, LlmResult, SegmentDraft, TextAnalysisService};
use adreel_models::{BatchJobState, ClipAsset, Segment, SegmentConstraints};
use adreel_orchestrator::{AdOrchestrator, OrchestratorConfig};
use adreel_storage::InMemoryObjectStore;

const USER: &str = "user-1";

struct FakeAnalysis {
    drafts: Option<Vec<SegmentDraft>>,
}

#[async_trait]
impl TextAnalysisService for FakeAnalysis {
    async fn analyze(
        &self,
        _script: &str,
        _constraints: &SegmentConstraints,
    ) -> LlmResult<Vec<SegmentDraft>> {
        self.drafts
            .clone()
            .ok_or_else(|| LlmError::ServiceUnavailable("model overloaded".to_string()))
    }

    async fn match_whole(
        &self,
        _script: &str,
        _segments: &[Segment],
        _clips: &[ClipAsset],
    ) -> LlmResult<Vec<ClipChoice>> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct FakeBatch {
    submitted: AtomicUsize,
}

#[async_trait]
impl BatchService for FakeBatch {
    async fn submit(&self, request: SubmitRequest) -> BatchResult<SubmittedJob> {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(SubmittedJob {
            job_id: "job-42".to_string(),
            job_name: request.job_name,
        })
    }

    async fn describe(&self, _job_id: &str) -> BatchResult<JobDescription> {
        Ok(JobDescription::new(BatchJobState::Succeeded))
    }
}

struct DownProbe;

#[async_trait]
impl ReadinessCheck for DownProbe {
    fn name(&self) -> &'static str {
        "firestore"
    }

    async fn check(&self) -> Result<u64, String> {
        Err("connection refused".to_string())
    }
}

fn coffee_drafts() -> Vec<SegmentDraft> {
    vec![
        SegmentDraft {
            text: "Buy our coffee.".to_string(),
            duration_seconds: 2.0,
            keywords: vec!["coffee".to_string()],
        },
        SegmentDraft {
            text: "It's fresh every morning.".to_string(),
            duration_seconds: 2.5,
            keywords: vec!["morning".to_string()],
        },
    ]
}

fn library() -> Vec<ClipAsset> {
    vec![
        ClipAsset::new("c1", "Pour", "user-1/clips/c1.mp4", vec!["coffee".into()]),
        ClipAsset::new("c2", "Sunrise", "user-1/clips/c2.mp4", vec!["morning".into()]),
    ]
}

fn config() -> ApiConfig {
    ApiConfig {
        backend: Backend::InMemory,
        ..Default::default()
    }
}

fn state_with(drafts: Option<Vec<SegmentDraft>>, clips: Vec<ClipAsset>) -> (AppState, Arc<FakeBatch>) {
    let batch = Arc::new(FakeBatch::default());
    let orchestrator = AdOrchestrator::new(
        Arc::new(InMemoryProjectStore::new()),
        Arc::new(InMemoryClipLibrary::with_clips(USER, clips)),
        Arc::new(InMemoryObjectStore::default()),
        Arc::new(FakeAnalysis { drafts }),
        batch.clone(),
        OrchestratorConfig::default(),
    );
    (AppState::with_orchestrator(config(), orchestrator), batch)
}

fn app_with(drafts: Option<Vec<SegmentDraft>>, clips: Vec<ClipAsset>) -> Router {
    create_router(state_with(drafts, clips).0, None)
}

fn app() -> Router {
    app_with(Some(coffee_drafts()), library())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create(app: &Router) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/projects",
        Some(json!({ "user_id": USER, "title": "Morning coffee" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_echoes_request_id() {
    let app = app();
    let request = Request::builder()
        .uri("/health")
        .header("X-Request-ID", "req-123")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_ready_without_probes() {
    let (status, body) = send(&app(), "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_ready_reports_failing_probe() {
    let (state, _) = state_with(Some(coffee_drafts()), library());
    let state = state.with_readiness(vec![Arc::new(DownProbe)]);
    let app = create_router(state, None);

    let (status, body) = send(&app, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["firestore"]["status"], "error");
    assert_eq!(body["checks"]["firestore"]["error"], "connection refused");
}

#[tokio::test]
async fn test_create_requires_title() {
    let (status, _) = send(
        &app(),
        "POST",
        "/api/projects",
        Some(json!({ "user_id": USER, "title": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_project_is_404() {
    let (status, body) = send(&app(), "GET", "/api/projects/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_full_render_flow() {
    let (state, batch) = state_with(Some(coffee_drafts()), library());
    let app = create_router(state, None);
    let id = create(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{}/segments", id),
        Some(json!({ "script": "Buy our coffee. It's fresh every morning." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let segments = body["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0]["id"], "seg-1");

    let (status, body) = send(&app, "POST", &format!("/api/projects/{}/matches", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let scenes = body["scene_assignments"].as_array().unwrap();
    assert_eq!(scenes.len(), 2);
    assert_eq!(scenes[0]["clips"][0]["clip_id"], "c1");
    assert_eq!(scenes[1]["clips"][0]["clip_id"], "c2");
    assert_eq!(scenes[1]["start_position_seconds"], 2.0);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{}/render", id),
        Some(json!({ "output_location": "user-1/exports/final.mp4" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["packaged"]["output_location"], "user-1/exports/final.mp4");

    let (status, body) = send(&app, "POST", &format!("/api/projects/{}/dispatch", id), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "processing");
    assert_eq!(body["batch_job"]["external_job_id"], "job-42");
    assert_eq!(batch.submitted.load(Ordering::SeqCst), 1);

    // Locked while rendering
    let (status, body) = send(&app, "POST", &format!("/api/projects/{}/matches", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");

    let (status, body) = send(&app, "POST", &format!("/api/projects/{}/poll", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["done"], true);
    assert_eq!(body["project"]["status"], "completed");
    assert_eq!(body["project"]["progress"], 100);

    let (status, body) = send(&app, "GET", &format!("/api/projects/{}/output", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output_location"], "user-1/exports/final.mp4");
}

#[tokio::test]
async fn test_matching_empty_library_is_422() {
    let app = app_with(Some(coffee_drafts()), Vec::new());
    let id = create(&app).await;
    send(
        &app,
        "POST",
        &format!("/api/projects/{}/segments", id),
        Some(json!({ "script": "Buy our coffee. It's fresh every morning." })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{}/matches", id),
        Some(json!({ "strategy": "tag" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "no_assets");
}

#[tokio::test]
async fn test_planning_failure_is_502_and_leaves_project() {
    let app = app_with(None, library());
    let id = create(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{}/segments", id),
        Some(json!({ "script": "Buy our coffee." })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "planning_failed");

    let (_, project) = send(&app, "GET", &format!("/api/projects/{}", id), None).await;
    assert_eq!(project["version"], 0);
    assert!(project["segments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dispatch_before_packaging_is_409() {
    let app = app();
    let id = create(&app).await;
    let (status, _) = send(&app, "POST", &format!("/api/projects/{}/dispatch", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_workflow_rejects_skipping_steps() {
    let app = app();
    let id = create(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/projects/{}/workflow", id),
        Some(json!({ "step": "editing" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{}/workflow", id),
        Some(json!({ "step": "matching", "payload": { "title": "Renamed" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workflow_step"], "matching");
    assert_eq!(body["title"], "Renamed");
}

#[tokio::test]
async fn test_override_with_unknown_clip_is_400() {
    let app = app();
    let id = create(&app).await;
    send(
        &app,
        "POST",
        &format!("/api/projects/{}/segments", id),
        Some(json!({ "script": "Buy our coffee. It's fresh every morning." })),
    )
    .await;
    send(&app, "POST", &format!("/api/projects/{}/matches", id), None).await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/projects/{}/scenes/seg-1/clips/0", id),
        Some(json!({ "clip_id": "missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "unknown_clip");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/projects/{}/scenes/seg-1/clips/0", id),
        Some(json!({ "clip_id": "c2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scene_assignments"][0]["clips"][0]["clip_id"], "c2");
}

#[tokio::test]
async fn test_voiceover_requires_synthesizer() {
    let app = app();
    let id = create(&app).await;
    let (status, body) = send(&app, "POST", &format!("/api/projects/{}/voiceover", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_input");
}
