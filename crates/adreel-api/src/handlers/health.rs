//! Health check handlers.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: BTreeMap<&'static str, ProbeResult>,
}

/// Outcome of one readiness probe, tagged by `status`.
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeResult {
    Ok { latency_ms: u64 },
    Error { error: String },
}

impl ProbeResult {
    fn is_ok(&self) -> bool {
        matches!(self, ProbeResult::Ok { .. })
    }
}

/// Readiness check endpoint (readiness probe).
///
/// With no probes configured (in-memory backend) the server is always ready.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let mut checks = BTreeMap::new();
    for probe in state.readiness.iter() {
        let result = match probe.check().await {
            Ok(latency_ms) => ProbeResult::Ok { latency_ms },
            Err(error) => ProbeResult::Error { error },
        };
        checks.insert(probe.name(), result);
    }

    if checks.values().all(ProbeResult::is_ok) {
        Ok(Json(ReadinessResponse {
            status: "ready",
            checks,
        }))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "degraded",
                checks,
            }),
        ))
    }
}
