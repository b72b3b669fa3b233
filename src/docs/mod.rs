use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Hub diagnostics, cloud admins only
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Hub and process diagnostics", body = DiagnosticsResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Not a cloud admin", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Live snapshot of an open document, cloud admins only
#[utoipa::path(
    get,
    path = "/api/v1/documents/{doc_id}/snapshot",
    params(
        ("doc_id" = String, Path, description = "Document id")
    ),
    responses(
        (status = 200, description = "Current room snapshot", body = DocumentSnapshotResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Not a cloud admin", body = ErrorResponse),
        (status = 404, description = "No open room for the document", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[allow(dead_code)]
pub async fn doc_snapshot_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
        doc_snapshot_doc,
    ),
    components(
        schemas(HealthResponse, DiagnosticsResponse, DocumentSnapshotResponse, ActiveUser, ErrorResponse)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
