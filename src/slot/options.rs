use crate::ad::RetryPolicy;
use crate::error::{AdSlotError, Result};
use crate::player::PlayerSettings;
use crate::tracking::ObserverConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How an image fills its box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    #[default]
    Cover,
    Contain,
    Fill,
}

/// Padding style token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    None,
    Sm,
    #[default]
    Md,
    Lg,
}

/// Host-facing configuration of one slot
///
/// Every option is independently defaulted; see the `Default` impl.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetOptions {
    // Label and dismiss
    pub show_label: bool,
    pub label_text: String,
    pub show_close: bool,

    // Auto-refresh
    pub auto_refresh: bool,
    pub refresh_interval: Duration,

    // Style tokens
    pub border: bool,
    pub background: bool,
    pub padding: Padding,

    // Images
    pub image_fit: ImageFit,
    pub image_height: Option<u32>,
    pub lazy_load: bool,

    // Placeholder
    pub placeholder_min_height: u32,
    pub placeholder_icon: String,
    pub placeholder_content: Option<String>,

    // Video
    pub video_autoplay: bool,
    pub video_muted: bool,
    pub video_loop: bool,
    pub video_controls: bool,
    pub allow_pip: bool,
    pub allow_fullscreen: bool,
    pub show_speed_menu: bool,
    pub skip_step: Duration,
    pub controls_hide_delay: Duration,

    // Visibility
    pub visibility_threshold: f64,
    pub visibility_margin: String,

    // Tracking and retries
    pub tracking_enabled: bool,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            show_label: true,
            label_text: "Advertisement".to_string(),
            show_close: false,
            auto_refresh: false,
            refresh_interval: Duration::from_secs(30),
            border: true,
            background: true,
            padding: Padding::Md,
            image_fit: ImageFit::Cover,
            image_height: None,
            lazy_load: true,
            placeholder_min_height: 250,
            placeholder_icon: "megaphone".to_string(),
            placeholder_content: None,
            video_autoplay: false,
            video_muted: true,
            video_loop: false,
            video_controls: true,
            allow_pip: true,
            allow_fullscreen: true,
            show_speed_menu: true,
            skip_step: Duration::from_secs(10),
            controls_hide_delay: Duration::from_secs(3),
            visibility_threshold: 0.5,
            visibility_margin: "0px".to_string(),
            tracking_enabled: true,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_secs(5),
        }
    }
}

impl WidgetOptions {
    /// Reject combinations that cannot work
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(AdSlotError::ConfigError(format!(
                "visibility_threshold must be within 0..=1, got {}",
                self.visibility_threshold
            )));
        }
        if self.retry_base_delay > self.retry_max_delay {
            return Err(AdSlotError::ConfigError(
                "retry_base_delay exceeds retry_max_delay".to_string(),
            ));
        }
        if self.skip_step.is_zero() {
            return Err(AdSlotError::ConfigError("skip_step must be positive".to_string()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: self.retry_base_delay,
            max_delay: self.retry_max_delay,
        }
    }

    pub fn observer_config(&self) -> ObserverConfig {
        ObserverConfig {
            threshold: self.visibility_threshold,
            root_margin: self.visibility_margin.clone(),
        }
    }

    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            muted: self.video_muted,
            looping: self.video_loop,
            allow_pip: self.allow_pip,
            allow_fullscreen: self.allow_fullscreen,
            skip_step: self.skip_step,
        }
    }

    /// Auto-refresh interval, if refreshing is on
    pub fn refresh_every(&self) -> Option<Duration> {
        (self.auto_refresh && !self.refresh_interval.is_zero()).then_some(self.refresh_interval)
    }
}
