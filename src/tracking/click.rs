use crate::ad::{AdApi, AdCandidate};
use crate::tracking::{TrackingEvent, fire_event};
use serde::Serialize;
use std::sync::Arc;

/// Where the host should navigate after a click
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub url: String,
    pub new_tab: bool,
}

impl Navigation {
    pub fn for_ad(ad: &AdCandidate) -> Option<Self> {
        ad.link_url.as_ref().map(|url| Navigation {
            url: url.clone(),
            new_tab: ad.open_in_new_tab,
        })
    }
}

/// Click recording for a slot's primary link
#[derive(Debug, Clone, Copy)]
pub struct ClickTracker {
    enabled: bool,
}

impl ClickTracker {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Record the click in the background and return the navigation target
    ///
    /// The navigation is returned whether or not the tracking call later
    /// succeeds; the call is never awaited.
    pub fn track<A: AdApi>(
        &self,
        api: &Arc<A>,
        ad: &AdCandidate,
        content_id: Option<&str>,
    ) -> Option<Navigation> {
        if self.enabled {
            fire_event(
                api.clone(),
                TrackingEvent::Click,
                ad.slug.clone(),
                content_id.map(str::to_string),
            );
        }
        Navigation::for_ad(ad)
    }
}
