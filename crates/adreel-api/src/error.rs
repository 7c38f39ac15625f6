//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use adreel_orchestrator::OrchestratorError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl ToString) -> Self {
        Self::BadRequest(msg.to_string())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Orchestrator(e) => match e {
                OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
                OrchestratorError::InvalidInput(_) | OrchestratorError::UnknownClip(_) => {
                    StatusCode::BAD_REQUEST
                }
                OrchestratorError::InvalidTransition(_)
                | OrchestratorError::Conflict(_)
                | OrchestratorError::JobFailed(_) => StatusCode::CONFLICT,
                OrchestratorError::NoAssetsAvailable => StatusCode::UNPROCESSABLE_ENTITY,
                OrchestratorError::PackagingSizeExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                OrchestratorError::PlanningFailed(_)
                | OrchestratorError::DispatchFailed(_)
                | OrchestratorError::SynthesisFailed(_) => StatusCode::BAD_GATEWAY,
                OrchestratorError::Storage(_)
                | OrchestratorError::Store(_)
                | OrchestratorError::Batch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> Option<String> {
        match self {
            ApiError::Orchestrator(e) => Some(e.kind().to_string()),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            detail,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adreel_storage::StorageError;

    fn status(err: OrchestratorError) -> StatusCode {
        ApiError::from(err).status_code()
    }

    #[test]
    fn test_orchestrator_status_mapping() {
        assert_eq!(status(OrchestratorError::not_found("project p")), StatusCode::NOT_FOUND);
        assert_eq!(status(OrchestratorError::invalid_input("x")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(OrchestratorError::invalid_transition("x")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(OrchestratorError::Conflict("stale".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(OrchestratorError::NoAssetsAvailable),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(OrchestratorError::PackagingSizeExceeded { size: 10, limit: 5 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status(OrchestratorError::planning_failed("llm down")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(OrchestratorError::dispatch_failed("rejected")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status(OrchestratorError::Storage(StorageError::upload_failed("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_code_is_error_kind() {
        let err = ApiError::from(OrchestratorError::NoAssetsAvailable);
        assert_eq!(err.code().as_deref(), Some("no_assets"));
        assert_eq!(ApiError::bad_request("x").code(), None);
    }
}
