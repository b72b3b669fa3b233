use axum::{extract::State, Json};
use crate::models::HealthResponse;
use crate::AppState;
use tracing::debug;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        rooms: None,
    })
}

/// Readiness check endpoint
pub async fn ready_check(State(app_state): State<AppState>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    // The hub answering a stats query means room locks are not wedged
    let stats = app_state.hub.stats().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Service is ready".to_string(),
        rooms: Some(stats.rooms),
    })
}
