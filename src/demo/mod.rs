//! In-memory ad backend for local development and end-to-end tests
//!
//! Implements the ad API contract the slot talks to: ad by placement,
//! impression and click recording, and media bytes.

pub mod handlers;
pub mod state;

pub use state::DemoState;

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Build the demo backend router
pub fn build_router(state: DemoState) -> Router {
    // Ads are embedded in pages served from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::serve_metrics))
        .route(
            "/api/ads/placement/{placement}",
            get(handlers::ads::serve_placement_ad),
        )
        .route(
            "/api/ads/{slug}/impression",
            post(handlers::ads::record_impression),
        )
        .route("/api/ads/{slug}/click", post(handlers::ads::record_click))
        .route("/media/{name}", get(handlers::media::serve_media))
        .layer(cors)
        .with_state(state)
}

/// Bind the demo backend on `port` (0 picks a free port) and serve it in
/// the background
///
/// The returned state shares its counters with the running server.
pub async fn spawn(
    port: u16,
    metrics: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> Result<(SocketAddr, DemoState), Box<dyn std::error::Error>> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind demo backend to {}: {}", addr, e);
            return Err(e.into());
        }
    };
    let local = listener.local_addr()?;

    let mut state = DemoState::new(&format!("http://{}", local));
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    let app = build_router(state.clone());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Demo backend error: {}", e);
        }
    });

    info!("Demo ad backend listening on http://{}", local);
    info!("Try: http://{}/api/ads/placement/sidebar_top", local);
    Ok((local, state))
}
