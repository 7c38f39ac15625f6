//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "adreel_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "adreel_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "adreel_http_requests_in_flight";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Collapse ids in a request path so label cardinality stays bounded.
fn sanitize_path(path: &str) -> String {
    let mut out = Vec::new();
    let mut placeholder: Option<&str> = None;
    for part in path.split('/') {
        match placeholder.take() {
            Some(name) if !part.is_empty() => out.push(name),
            _ => out.push(part),
        }
        placeholder = match part {
            "projects" => Some(":id"),
            "scenes" => Some(":segment_id"),
            "clips" => Some(":slot"),
            _ => None,
        };
    }
    out.join("/")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    record_http_request(&method, &path, status, start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/projects/550e8400-e29b-41d4-a716-446655440000/segments"),
            "/api/projects/:id/segments"
        );
        assert_eq!(
            sanitize_path("/api/projects/p1/scenes/seg-2/clips/0"),
            "/api/projects/:id/scenes/:segment_id/clips/:slot"
        );
        assert_eq!(sanitize_path("/api/projects"), "/api/projects");
        assert_eq!(sanitize_path("/api/projects/"), "/api/projects/");
        assert_eq!(sanitize_path("/health"), "/health");
    }
}
