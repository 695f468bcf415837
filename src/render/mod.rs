//! View models for a mounted slot
//!
//! The renderer never touches remote media URLs: images, posters and video
//! sources always point at the slot's local blob handles.

pub mod sanitize;

pub use sanitize::{ALLOWED_TAGS, sanitize_html};

use crate::ad::Creative;
use crate::media::MediaSlot;
use crate::player::{PLAYBACK_RATES, PlaybackState, PlayerPhase, VideoController};
use crate::slot::{ImageFit, LoadedAd, Padding, VideoStage, WidgetOptions};
use crate::tracking::Navigation;
use serde::Serialize;

/// Everything the host draws for one slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub label: Option<String>,
    pub dismissible: bool,
    pub style: StyleTokens,
    pub body: View,
}

impl Frame {
    pub fn is_empty(&self) -> bool {
        self.body == View::Nothing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleTokens {
    pub border: bool,
    pub background: bool,
    pub padding: Padding,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum View {
    /// No ad, a dismissed slot, or a failed fetch. The host draws nothing.
    Nothing,
    Placeholder(PlaceholderView),
    Image(ImageView),
    VideoThumbnail(ThumbnailView),
    VideoPlayer(PlayerView),
    Html(HtmlView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceholderView {
    pub min_height: u32,
    pub icon: String,
    pub content: Option<String>,
    /// Media failed to load (as opposed to still loading)
    pub failed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageView {
    pub src: String,
    pub alt: String,
    pub fit: ImageFit,
    pub height: Option<u32>,
    pub lazy: bool,
    pub cta_text: Option<String>,
    pub link: Option<Navigation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThumbnailView {
    pub title: String,
    /// Local handle of the poster image; `None` shows a generic play tile
    pub poster: Option<String>,
    /// Video bytes are being fetched after activation
    pub loading: bool,
    /// The last playback ran to the end
    pub ended: bool,
    /// The last activation failed to load the video
    pub failed: bool,
    pub cta_text: Option<String>,
    pub link: Option<Navigation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub title: String,
    pub src: Option<String>,
    pub phase: PlayerPhase,
    pub state: PlaybackState,
    pub progress: f64,
    pub elapsed: String,
    pub duration: String,
    pub controls: ControlsView,
    pub cta_text: Option<String>,
    pub link: Option<Navigation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlsView {
    pub enabled: bool,
    pub visible: bool,
    pub allow_pip: bool,
    pub allow_fullscreen: bool,
    /// Empty when the speed menu is hidden
    pub playback_rates: Vec<f64>,
    pub skip_step_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HtmlView {
    /// Sanitised markup
    pub markup: String,
    pub link: Option<Navigation>,
}

/// Format seconds as `m:ss`, or `h:mm:ss` from one hour up
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

pub(crate) fn frame(options: &WidgetOptions, body: View) -> Frame {
    let visible = body != View::Nothing;
    Frame {
        label: (visible && options.show_label).then(|| options.label_text.clone()),
        dismissible: visible && options.show_close,
        style: StyleTokens {
            border: options.border,
            background: options.background,
            padding: options.padding,
        },
        body,
    }
}

pub(crate) fn placeholder(options: &WidgetOptions, failed: bool) -> View {
    View::Placeholder(PlaceholderView {
        min_height: options.placeholder_min_height,
        icon: options.placeholder_icon.clone(),
        content: options.placeholder_content.clone(),
        failed,
    })
}

/// Dispatch on the creative type of a committed ad
pub(crate) fn ad_view(loaded: &LoadedAd, options: &WidgetOptions) -> View {
    let ad = &loaded.ad;
    let link = Navigation::for_ad(ad);

    match &ad.creative {
        Creative::Image { alt, .. } => match &loaded.primary {
            MediaSlot::Ready(blob) => View::Image(ImageView {
                src: blob.url().to_string(),
                alt: alt.clone(),
                fit: options.image_fit,
                height: options.image_height,
                lazy: options.lazy_load,
                cta_text: ad.cta_text.clone(),
                link,
            }),
            media => placeholder(options, media.is_failed()),
        },
        Creative::Video { .. } => match &loaded.stage {
            VideoStage::Active(controller) => {
                View::VideoPlayer(player_view(loaded, controller, options, link))
            }
            VideoStage::Loading(_) => View::VideoThumbnail(thumbnail_view(loaded, true, false, link)),
            VideoStage::Thumbnail { ended } => {
                View::VideoThumbnail(thumbnail_view(loaded, false, *ended, link))
            }
        },
        Creative::Html { .. } => View::Html(HtmlView {
            markup: loaded.markup.clone().unwrap_or_default(),
            link,
        }),
    }
}

fn thumbnail_view(
    loaded: &LoadedAd,
    loading: bool,
    ended: bool,
    link: Option<Navigation>,
) -> ThumbnailView {
    ThumbnailView {
        title: loaded.ad.title.clone(),
        poster: loaded.primary.blob_url().map(str::to_string),
        loading,
        ended,
        failed: loaded.video.is_failed(),
        cta_text: loaded.ad.cta_text.clone(),
        link,
    }
}

fn player_view(
    loaded: &LoadedAd,
    controller: &VideoController,
    options: &WidgetOptions,
    link: Option<Navigation>,
) -> PlayerView {
    let state = controller.state();
    PlayerView {
        title: loaded.ad.title.clone(),
        src: loaded.video.blob_url().map(str::to_string),
        phase: controller.phase(),
        state: state.clone(),
        progress: state.progress(),
        elapsed: format_time(state.current_time),
        duration: format_time(state.duration),
        controls: ControlsView {
            enabled: options.video_controls,
            visible: options.video_controls && state.controls_visible,
            allow_pip: options.allow_pip,
            allow_fullscreen: options.allow_fullscreen,
            playback_rates: if options.show_speed_menu {
                PLAYBACK_RATES.to_vec()
            } else {
                Vec::new()
            },
            skip_step_secs: options.skip_step.as_secs(),
        },
        cta_text: loaded.ad.cta_text.clone(),
        link,
    }
}
