use crate::error;
use crate::slot::WidgetOptions;
use std::env;
use std::time::Duration;

/// Demo host configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub is_dev: bool,
    /// Ad API base URL; `None` in dev mode means "use the built-in demo backend"
    pub api_base_url: Option<String>,
    pub placement: String,
    pub content_id: Option<String>,
    pub max_retries: u32,
    /// Auto-refresh interval in seconds, 0 disables
    pub auto_refresh_secs: u64,
    pub tracking_enabled: bool,
    /// Share of the slot that must be on screen to count an impression
    pub visibility_threshold: f64,
    /// Per-request timeout for the ad API
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    /// In DEV mode, provides sensible defaults. In PROD mode, API_BASE_URL and PLACEMENT are required.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Check if running in dev mode
        let is_dev = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        // Port of the demo backend, 0 picks a free one
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        // API base URL: required in prod, demo backend in dev
        let api_base_url = if is_dev {
            env::var("API_BASE_URL").ok()
        } else {
            Some(env::var("API_BASE_URL").map_err(|_| "API_BASE_URL is required in production")?)
        };

        // Placement: required in prod, defaults to the demo image slot in dev
        let placement = if is_dev {
            env::var("PLACEMENT").unwrap_or_else(|_| "sidebar_top".to_string())
        } else {
            env::var("PLACEMENT").map_err(|_| "PLACEMENT is required in production")?
        };

        let content_id = env::var("CONTENT_ID").ok().filter(|id| !id.is_empty());

        let max_retries = env::var("MAX_RETRIES")
            .unwrap_or_else(|_| "3".to_string())
            .parse()?;

        let auto_refresh_secs = env::var("AUTO_REFRESH_SECS")
            .unwrap_or_else(|_| "0".to_string())
            .parse()?;

        let tracking_enabled = env::var("TRACKING_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        let visibility_threshold = env::var("VISIBILITY_THRESHOLD")
            .unwrap_or_else(|_| "0.5".to_string())
            .parse()?;

        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()?;

        Ok(Config {
            port,
            is_dev,
            api_base_url,
            placement,
            content_id,
            max_retries,
            auto_refresh_secs,
            tracking_enabled,
            visibility_threshold,
            request_timeout_secs,
        })
    }

    /// Slot options for this configuration, everything else defaulted
    pub fn widget_options(&self) -> error::Result<WidgetOptions> {
        let options = WidgetOptions {
            auto_refresh: self.auto_refresh_secs > 0,
            refresh_interval: if self.auto_refresh_secs > 0 {
                Duration::from_secs(self.auto_refresh_secs)
            } else {
                WidgetOptions::default().refresh_interval
            },
            tracking_enabled: self.tracking_enabled,
            max_retries: self.max_retries,
            visibility_threshold: self.visibility_threshold,
            ..WidgetOptions::default()
        };
        options.validate()?;
        Ok(options)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
