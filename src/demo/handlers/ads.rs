use crate::demo::state::DemoState;
use crate::error::AdSlotError;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct PlacementQuery {
    pub content_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrackingRequest {
    #[serde(default)]
    pub content_id: Option<String>,
}

/// Serve the ad for a placement, or JSON `null` when there is none
pub async fn serve_placement_ad(
    State(state): State<DemoState>,
    Path(placement): Path<String>,
    Query(query): Query<PlacementQuery>,
) -> Response {
    if state.take_failure(&placement) {
        warn!("Serving scripted failure for placement {}", placement);
        return AdSlotError::Status(503).into_response();
    }

    match state.ad_for(&placement) {
        Some(record) => {
            info!(
                "Serving ad {} for placement {} (content: {:?})",
                record.slug, placement, query.content_id
            );
            Json(record.clone()).into_response()
        }
        None => {
            info!("No ad for placement {}", placement);
            Json(serde_json::Value::Null).into_response()
        }
    }
}

pub async fn record_impression(
    State(state): State<DemoState>,
    Path(slug): Path<String>,
    Json(body): Json<TrackingRequest>,
) -> Response {
    if !state.record_impression(&slug) {
        return StatusCode::NOT_FOUND.into_response();
    }
    info!("Impression: {} (content: {:?})", slug, body.content_id);
    StatusCode::NO_CONTENT.into_response()
}

pub async fn record_click(
    State(state): State<DemoState>,
    Path(slug): Path<String>,
    Json(body): Json<TrackingRequest>,
) -> Response {
    if !state.record_click(&slug) {
        return StatusCode::NOT_FOUND.into_response();
    }
    info!("Click: {} (content: {:?})", slug, body.content_id);
    StatusCode::NO_CONTENT.into_response()
}
