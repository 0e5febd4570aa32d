// Handlers module
// HTTP handlers for the REST API

pub mod tutorials;

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::routes::AppState;

/// Health check handler
/// Returns "OK" when the store answers, 500 otherwise
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "UNAVAILABLE")
        }
    }
}
