use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use super::ErrorResponse;
use crate::state::AppState;

/// Health check endpoint; healthy when the database answers
#[tracing::instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse, ErrorResponse> {
    state
        .db_pool
        .health_check()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Health check failed");
            ErrorResponse::new("service_unavailable", "Database unavailable")
        })?;

    Ok((StatusCode::OK, Json(json!({ "status": "healthy" }))))
}
