use axum::{
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use common::auth::verify_cron_secret;

use crate::handlers::ErrorResponse;
use crate::state::AppState;

/// Rejects requests whose `Authorization: Bearer` token is not the cron secret
#[tracing::instrument(skip(state, req, next))]
pub async fn cron_auth_middleware(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ErrorResponse> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = verify_cron_secret(header, &state.config.auth.cron_secret) {
        tracing::warn!(error = %e, "Rejected scheduler trigger");
        return Err(e.into());
    }

    Ok(next.run(req).await)
}
