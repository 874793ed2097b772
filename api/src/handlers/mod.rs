pub mod health;
pub mod metrics;
pub mod scheduler;

// Common response types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::errors::ProcessError;
use serde::Serialize;

/// Standard API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub trace_id: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl From<ProcessError> for ErrorResponse {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Authorization(_) => ErrorResponse::new("unauthorized", "Unauthorized"),
            other => {
                // Detail stays in the logs, not in the response body
                tracing::error!(error = %other, reason = other.reason(), "Scheduler trigger failed");
                ErrorResponse::new("internal_error", "Failed to process scheduled searches")
            }
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.error.as_str() {
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "validation_error" => StatusCode::BAD_REQUEST,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}
