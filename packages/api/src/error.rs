use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use storage::StorageError;

/// Errors returned to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("shutting down")]
    ShuttingDown,

    #[error("Invalid job_id")]
    InvalidJobId,

    #[error("failed to read result: {0}")]
    Storage(#[from] StorageError),
}

impl From<job_core::RequestError> for ApiError {
    fn from(err: job_core::RequestError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<actors::SubmitError> for ApiError {
    fn from(err: actors::SubmitError) -> Self {
        match err {
            actors::SubmitError::ShuttingDown => ApiError::ShuttingDown,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let reason = self.to_string();
        match self {
            ApiError::ShuttingDown => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"job_id": -1, "reason": reason})),
            )
                .into_response(),
            ApiError::BadRequest(_) => error_body(StatusCode::BAD_REQUEST, reason),
            ApiError::InvalidJobId => error_body(StatusCode::NOT_FOUND, reason),
            ApiError::Storage(_) => {
                tracing::error!("{}", reason);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, reason)
            }
        }
    }
}

fn error_body(status: StatusCode, reason: String) -> Response {
    (status, Json(json!({"status": "error", "reason": reason}))).into_response()
}
