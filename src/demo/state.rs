use crate::ad::{AdRecord, AdType};
use dashmap::DashMap;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// State shared across the demo backend handlers
#[derive(Clone)]
pub struct DemoState {
    /// Ads keyed by placement
    catalogue: Arc<HashMap<String, AdRecord>>,
    /// Recorded impressions per slug
    impressions: Arc<DashMap<String, u64>>,
    /// Recorded clicks per slug
    clicks: Arc<DashMap<String, u64>>,
    /// Scripted failures still to serve, per placement
    failures: Arc<DashMap<String, u32>>,
    /// Prometheus handle, when the host installed a recorder
    pub metrics: Option<PrometheusHandle>,
    pub started_at: Instant,
}

impl DemoState {
    /// Build the demo catalogue; media URLs point back at `base_url`
    pub fn new(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let catalogue: HashMap<String, AdRecord> = demo_catalogue(base)
            .into_iter()
            .map(|record| (record.placement.clone(), record))
            .collect();

        info!("Demo catalogue: {} placements", catalogue.len());

        Self {
            catalogue: Arc::new(catalogue),
            impressions: Arc::new(DashMap::new()),
            clicks: Arc::new(DashMap::new()),
            failures: Arc::new(DashMap::new()),
            metrics: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn ad_for(&self, placement: &str) -> Option<&AdRecord> {
        self.catalogue.get(placement)
    }

    pub fn placement_count(&self) -> usize {
        self.catalogue.len()
    }

    fn is_known_slug(&self, slug: &str) -> bool {
        self.catalogue.values().any(|record| record.slug == slug)
    }

    /// Make the next `count` requests for `placement` fail with 503
    pub fn fail_next(&self, placement: &str, count: u32) {
        self.failures.insert(placement.to_string(), count);
    }

    /// Consume one scripted failure, if any remain
    pub(crate) fn take_failure(&self, placement: &str) -> bool {
        match self.failures.get_mut(placement) {
            Some(mut remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    /// Count an impression; `false` for slugs not in the catalogue
    pub(crate) fn record_impression(&self, slug: &str) -> bool {
        if !self.is_known_slug(slug) {
            return false;
        }
        *self.impressions.entry(slug.to_string()).or_insert(0) += 1;
        true
    }

    pub(crate) fn record_click(&self, slug: &str) -> bool {
        if !self.is_known_slug(slug) {
            return false;
        }
        *self.clicks.entry(slug.to_string()).or_insert(0) += 1;
        true
    }

    pub fn impressions(&self, slug: &str) -> u64 {
        self.impressions.get(slug).map(|count| *count).unwrap_or(0)
    }

    pub fn clicks(&self, slug: &str) -> u64 {
        self.clicks.get(slug).map(|count| *count).unwrap_or(0)
    }
}

fn demo_catalogue(base: &str) -> Vec<AdRecord> {
    vec![
        AdRecord {
            id: 1,
            title: "Spring sale".to_string(),
            slug: "spring-sale".to_string(),
            ad_type: AdType::Image,
            image_url: Some(format!("{base}/media/spring-sale.png")),
            image_alt: Some("Everything 30% off".to_string()),
            video_url: None,
            video_thumbnail_url: None,
            html_content: None,
            link_url: Some("https://shop.example.com/spring".to_string()),
            open_in_new_tab: true,
            cta_text: Some("Shop now".to_string()),
            placement: "sidebar_top".to_string(),
        },
        AdRecord {
            id: 2,
            title: "Product launch".to_string(),
            slug: "product-launch".to_string(),
            ad_type: AdType::Video,
            image_url: None,
            image_alt: None,
            video_url: Some(format!("{base}/media/product-launch.mp4")),
            video_thumbnail_url: Some(format!("{base}/media/product-launch.jpg")),
            html_content: None,
            link_url: Some("https://launch.example.com".to_string()),
            open_in_new_tab: false,
            cta_text: Some("Watch more".to_string()),
            placement: "header_banner".to_string(),
        },
        AdRecord {
            id: 3,
            title: "Newsletter".to_string(),
            slug: "newsletter".to_string(),
            ad_type: AdType::Html,
            image_url: None,
            image_alt: None,
            video_url: None,
            video_thumbnail_url: None,
            html_content: Some(
                r#"<div class="promo"><h3>Stay in the loop</h3><script>document.cookie</script><p>Weekly picks, <a href="https://news.example.com" target="_blank" onclick="track()">subscribe</a>.</p></div>"#
                    .to_string(),
            ),
            link_url: None,
            open_in_new_tab: false,
            cta_text: None,
            placement: "footer".to_string(),
        },
    ]
}
