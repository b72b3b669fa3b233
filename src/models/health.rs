use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API response for health and readiness checks
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    /// Open rooms, reported by the readiness check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms: Option<u32>,
}
