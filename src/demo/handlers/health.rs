use crate::demo::state::DemoState;
use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub placements: usize,
    pub uptime_seconds: u64,
}

/// Health check endpoint returning structured JSON diagnostics
pub async fn health_check(State(state): State<DemoState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: VERSION,
        placements: state.placement_count(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}
