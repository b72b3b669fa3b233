use crate::{auth::auth, models::{DiagnosticsResponse, ErrorResponse}, AppState};
use axum::{extract::{State, Extension}, http::StatusCode, Json};
use std::sync::{Mutex, OnceLock};
use sysinfo::System;
use tracing::{info, warn};

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

#[derive(Debug, Default, Clone, Copy)]
struct ProcessStats {
    cpu_usage: f32,
    memory_used: u64,
    memory_free: u64,
    memory_total: u64,
}

fn sample_process_stats() -> ProcessStats {
    let monitor = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
    let Ok(mut sys) = monitor.lock() else {
        warn!("System monitor lock poisoned, reporting zeroed stats");
        return ProcessStats::default();
    };
    sys.refresh_cpu();
    sys.refresh_memory();
    ProcessStats {
        cpu_usage: sys.global_cpu_info().cpu_usage(),
        memory_used: sys.used_memory(),
        memory_free: sys.free_memory(),
        memory_total: sys.total_memory(),
    }
}

/// Report room, connection and host load figures
pub async fn diagnostics(
    State(app_state): State<AppState>,
    Extension(prpls): Extension<Vec<String>>,
) -> Result<(StatusCode, Json<DiagnosticsResponse>), (StatusCode, Json<ErrorResponse>)> {

    auth::ensure_cloud_admin(&prpls)?;

    let hub = app_state.hub.stats().await;
    let host = sample_process_stats();

    const MB: u64 = 1024 * 1024;
    info!(
        "Diagnostics: {} rooms ({} dirty), {} participants, {} cached snapshots, CPU {:.2}%, Mem {}/{} MB",
        hub.rooms,
        hub.dirty_rooms,
        hub.connections,
        hub.cached_snapshots,
        host.cpu_usage,
        host.memory_used / MB,
        host.memory_total / MB,
    );

    Ok((
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_conn: hub.connections,
            n_rooms: hub.rooms,
            n_dirty_docs: hub.dirty_rooms,
            n_cached_snapshots: hub.cached_snapshots,
            cpu_usage: host.cpu_usage,
            memory_alloc: host.memory_used,
            memory_total: host.memory_total,
            memory_free: host.memory_free,
        }),
    ))
}
