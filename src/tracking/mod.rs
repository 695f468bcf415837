pub mod click;
pub mod impression;

pub use click::{ClickTracker, Navigation};
pub use impression::{ImpressionTracker, IntersectionEntry, ObserverConfig};

use crate::ad::AdApi;
use crate::metrics;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Event recorded against the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
    Impression,
    Click,
}

impl TrackingEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingEvent::Impression => "impression",
            TrackingEvent::Click => "click",
        }
    }
}

/// Fire a tracking call (fire-and-forget)
///
/// Spawns a background task and returns immediately. No retries: tracking is
/// best effort and a failure is only logged.
///
/// # Arguments
/// * `api` - Backend to record against
/// * `event` - Which event to record
/// * `slug` - Slug of the ad
/// * `content_id` - Content the ad was shown within
pub fn fire_event<A: AdApi>(
    api: Arc<A>,
    event: TrackingEvent,
    slug: String,
    content_id: Option<String>,
) {
    tokio::spawn(async move {
        let result = match event {
            TrackingEvent::Impression => {
                api.record_impression(&slug, content_id.as_deref()).await
            }
            TrackingEvent::Click => api.record_click(&slug, content_id.as_deref()).await,
        };

        match result {
            Ok(()) => {
                debug!("Tracking call: {} for {} (content: {:?})", event.as_str(), slug, content_id);
                info!("Tracking call: {} ({})", event.as_str(), slug);
                metrics::record_tracking_call(event.as_str(), "success");
            }
            Err(e) => {
                warn!("Tracking call failed: {} for {} ({})", event.as_str(), slug, e);
                metrics::record_tracking_call(event.as_str(), "error");
            }
        }
    });
}
