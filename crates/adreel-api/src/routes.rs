//! API routes.

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    advance_workflow, create_project, dispatch_render, get_output, get_project, health,
    match_clips, override_clip, package_render, plan_segments, poll_render, ready,
    synthesize_voiceover,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let project_routes = Router::new()
        .route("/projects", post(create_project))
        .route("/projects/:id", get(get_project))
        // Planning and matching
        .route("/projects/:id/segments", post(plan_segments))
        .route("/projects/:id/matches", post(match_clips))
        .route(
            "/projects/:id/scenes/:segment_id/clips/:slot",
            put(override_clip),
        )
        .route("/projects/:id/voiceover", post(synthesize_voiceover))
        // Rendering
        .route("/projects/:id/render", post(package_render))
        .route("/projects/:id/dispatch", post(dispatch_render))
        .route("/projects/:id/poll", post(poll_render))
        .route("/projects/:id/output", get(get_output))
        .route("/projects/:id/workflow", post(advance_workflow));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", project_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
