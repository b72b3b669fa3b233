use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Hub and host figures for operators
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    /// Participants across all open rooms
    pub n_conn: u32,
    /// Open document rooms
    pub n_rooms: u32,
    /// Rooms edited since their snapshot was loaded
    pub n_dirty_docs: u32,
    /// Closed rooms still held in the snapshot cache
    pub n_cached_snapshots: u32,
    pub cpu_usage: f32,
    pub memory_alloc: u64,
    pub memory_total: u64,
    pub memory_free: u64,
}
