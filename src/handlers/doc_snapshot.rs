use crate::{auth::auth, models::{DocumentSnapshotResponse, ErrorResponse}, AppState};
use axum::{extract::{State, Path, Extension}, http::StatusCode, Json};
use tracing::debug;

/// Live snapshot of an open document room, cloud admins only
pub async fn doc_snapshot(
    State(app_state): State<AppState>,
    Extension(prpls): Extension<Vec<String>>,
    Path(doc_id): Path<String>,
) -> Result<(StatusCode, Json<DocumentSnapshotResponse>), (StatusCode, Json<ErrorResponse>)> {

    auth::ensure_cloud_admin(&prpls)?;

    match app_state.hub.snapshot(&doc_id).await {
        Some(snapshot) => Ok((StatusCode::OK, Json(snapshot))),
        None => {
            debug!("No open room for document '{}'", doc_id);
            Err(ErrorResponse::reply(
                StatusCode::NOT_FOUND,
                format!("Document '{}' is not open", doc_id),
            ))
        }
    }
}
