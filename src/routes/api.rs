use crate::{handlers::{diagnostics, doc_snapshot, health_check, ready_check}, routes::auth_middleware::auth_middleware, AppState};
use axum::{routing::get, Router, middleware};

/// Create API routes
pub fn create_api_routes(app_state: AppState) -> Router<AppState> {
    let protected = Router::<AppState>::new()
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/documents/:doc_id/snapshot", get(doc_snapshot))
        .route_layer(middleware::from_fn_with_state(app_state, auth_middleware)); // Applies to all routes added above

    Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .merge(protected)
}
