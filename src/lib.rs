//! Real-time plain-text collaboration: a WebSocket hub that keeps one
//! authoritative snapshot per document and relays positional edits and
//! cursors between participants, plus the session client editors use to talk
//! to it.

pub mod auth;
pub mod client;
pub mod clients;
pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod ops;
pub mod routes;
pub mod services;
pub mod utils;
pub mod websocket;
pub mod ws;

use std::sync::Arc;

use axum::{body::Body, http::{HeaderValue, Request}, routing::get, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug_span, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::docs::ApiDoc;
use crate::routes::create_api_routes;
use crate::services::doc_store::{store_from_config, StoreError};
use crate::utils::redact::redact_uri;
use crate::websocket::websocket_handler;
use crate::ws::snapshot_cache::SnapshotCache;
use crate::ws::Hub;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<Hub>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the hub and its document store from configuration.
    pub fn from_config(config: Config) -> Result<Self, StoreError> {
        let store = store_from_config(&config)?;
        let snapshots = SnapshotCache::new(config.snapshot_cache_capacity, config.snapshot_cache_ttl());
        let hub = Hub::new(store, snapshots, config.persist_on_close);
        Ok(Self { hub: Arc::new(hub), config: Arc::new(config) })
    }
}

/// Assemble the full router: WebSocket hub, REST API and Swagger UI.
pub fn build_app(app_state: AppState) -> Router {
    let ws_path = app_state.config.ws_path.clone();
    let cors = cors_layer(&app_state.config);

    Router::new()
        .route(&ws_path, get(websocket_handler))
        .nest("/api", create_api_routes(app_state.clone()))
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(app_state)
}

/// Span for one HTTP request. The upgrade URI may carry `?token=`, so the
/// query is redacted before it is recorded.
fn request_span(request: &Request<Body>) -> tracing::Span {
    debug_span!(
        "request",
        method = %request.method(),
        uri = %redact_uri(request.uri()),
        version = ?request.version(),
    )
}

fn cors_layer(config: &Config) -> CorsLayer {
    match config.cors_origin_list() {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin '{}'", o);
                        None
                    }
                })
                .collect();
            CorsLayer::new().allow_origin(AllowOrigin::list(origins))
        }
        None => CorsLayer::permissive(),
    }
}
