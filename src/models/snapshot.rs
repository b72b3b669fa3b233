use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::models::ActiveUser;

/// Live snapshot of an open room
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshotResponse {
    pub document_id: String,
    pub content: String,
    pub version: i64,
    pub dirty: bool,
    pub active_users: Vec<ActiveUser>,
}
