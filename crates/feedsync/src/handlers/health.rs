//! Health check endpoints for Kubernetes-style probes.
//!
//! - `/livez` - Basic liveness probe (immediate 200, no checks)
//! - `/healthz` - Distribution stats (open connections, pending refreshes)

use axum::{extract::State, http::StatusCode, Json};

use crate::realtime::DistributorStats;
use crate::state::AppState;

/// GET /livez - Basic liveness probe.
#[axum::debug_handler]
pub async fn livez() -> StatusCode {
    StatusCode::OK
}

/// GET /healthz - Passive distribution stats.
#[axum::debug_handler]
pub async fn healthz(State(state): State<AppState>) -> Json<DistributorStats> {
    Json(state.distributor.stats().await)
}
