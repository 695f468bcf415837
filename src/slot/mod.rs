//! The mounted ad slot
//!
//! One [`AdSlot`] owns everything a placement needs: the fetch cycle, the
//! media blobs, the impression observer, the video controller and the
//! timers. Background work runs in spawned tasks that report back through
//! the slot's channel; the host drives the slot by awaiting
//! [`AdSlot::step`] (or calling [`AdSlot::drain`]) and by forwarding user
//! interaction.
//!
//! Every spawned result is tagged with the generation it was started for.
//! `fetch_generation` changes whenever a fetch is superseded (context
//! change, dismiss, teardown); `ad_generation` changes whenever the
//! committed ad changes. Results for an older generation are dropped.

pub mod callbacks;
pub mod options;
pub(crate) mod refresh;

pub use callbacks::Callbacks;
pub use options::{ImageFit, Padding, WidgetOptions};

use crate::ad::{
    AdApi, AdCandidate, AdRequest, Creative, FetchOutcome, RetryPolicy, RetryState,
    fetch_with_retry,
};
use crate::error::{AdSlotError, Result};
use crate::media::{BlobRegistry, BlobStats, MediaKind, MediaSlot, load_media};
use crate::metrics;
use crate::player::{AutoHideOverlay, MediaElement, MediaEvent, PlayerSignal, VideoController};
use crate::render::{self, Frame, View, sanitize_html};
use crate::tracking::{
    ClickTracker, ImpressionTracker, IntersectionEntry, Navigation, ObserverConfig,
    TrackingEvent, fire_event,
};
use refresh::RefreshScheduler;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

/// Creates platform media elements for autoplay
pub type MediaFactory = Box<dyn Fn() -> Box<dyn MediaElement> + Send + Sync>;

/// Results of background work, delivered back to the owning slot
pub(crate) enum SlotMessage {
    Fetched {
        generation: u64,
        outcome: FetchOutcome,
    },
    MediaLoaded {
        generation: u64,
        kind: MediaKind,
        result: Result<Vec<u8>>,
    },
    RefreshTick {
        epoch: u64,
    },
    HideControls {
        generation: u64,
        epoch: u64,
    },
}

/// Coarse lifecycle of a slot, for hosts and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    /// First fetch cycle still running
    Loading,
    /// Backend has no ad for this placement
    Empty,
    /// Retries exhausted; nothing is shown until the context changes
    Failed,
    Ready,
    Dismissed,
    TornDown,
}

enum SlotPhase {
    Loading,
    Empty,
    Failed,
    Ready(Box<LoadedAd>),
    Dismissed,
    TornDown,
}

/// Video sub-state of a committed ad
pub(crate) enum VideoStage {
    Thumbnail { ended: bool },
    /// Activated; waiting for the video bytes
    Loading(Box<dyn MediaElement>),
    Active(VideoController),
}

/// A committed ad with the assets loaded for it
pub(crate) struct LoadedAd {
    pub(crate) ad: AdCandidate,
    // Closes the player before its blob is revoked
    pub(crate) stage: VideoStage,
    /// Image, or thumbnail of a video ad
    pub(crate) primary: MediaSlot,
    pub(crate) video: MediaSlot,
    /// Sanitised payload of an HTML ad
    pub(crate) markup: Option<String>,
}

impl LoadedAd {
    fn new(ad: AdCandidate) -> Self {
        let markup = match &ad.creative {
            Creative::Html { payload } => Some(sanitize_html(payload)),
            _ => None,
        };
        Self {
            ad,
            stage: VideoStage::Thumbnail { ended: false },
            primary: MediaSlot::Idle,
            video: MediaSlot::Idle,
            markup,
        }
    }
}

/// A mounted ad widget instance
pub struct AdSlot<A: AdApi> {
    api: Arc<A>,
    options: WidgetOptions,
    callbacks: Callbacks,
    request: AdRequest,
    media_factory: Option<MediaFactory>,

    tx: mpsc::UnboundedSender<SlotMessage>,
    rx: mpsc::UnboundedReceiver<SlotMessage>,
    fetch_generation: u64,
    ad_generation: u64,

    phase: SlotPhase,
    retry: RetryState,
    impression: ImpressionTracker,
    clicks: ClickTracker,
    blobs: BlobRegistry,
    overlay: AutoHideOverlay,
    refresh: RefreshScheduler,

    fetch_task: Option<AbortHandle>,
    media_tasks: Vec<AbortHandle>,
    video_task: Option<AbortHandle>,
    hide_timer: Option<AbortHandle>,
}

impl<A: AdApi> AdSlot<A> {
    /// Mount a slot and start its first fetch cycle
    ///
    /// Options failing [`WidgetOptions::validate`] are reported to
    /// `on_error` without stopping the slot. Must be called from within a
    /// tokio runtime.
    pub fn mount(
        api: Arc<A>,
        request: AdRequest,
        options: WidgetOptions,
        callbacks: Callbacks,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let impression = ImpressionTracker::new(options.observer_config());
        let clicks = ClickTracker::new(options.tracking_enabled);
        let overlay = AutoHideOverlay::new(options.controls_hide_delay);

        let mut slot = Self {
            api,
            options,
            callbacks,
            request,
            media_factory: None,
            tx,
            rx,
            fetch_generation: 0,
            ad_generation: 0,
            phase: SlotPhase::Loading,
            retry: RetryState::default(),
            impression,
            clicks,
            blobs: BlobRegistry::new(),
            overlay,
            refresh: RefreshScheduler::default(),
            fetch_task: None,
            media_tasks: Vec::new(),
            video_task: None,
            hide_timer: None,
        };

        info!(
            "Mounting ad slot for placement {} (content: {:?})",
            slot.request.placement, slot.request.content_id
        );
        metrics::slot_mounted();

        // Out-of-range values are clamped where they are used
        if let Err(e) = slot.options.validate() {
            error!("Invalid options for {}: {}", slot.request.placement, e);
            slot.callbacks.emit_error(&e);
        }

        slot.start_fetch();
        slot.start_refresh();
        slot
    }

    /// Supply media elements for `video_autoplay`
    pub fn with_media_factory(
        mut self,
        factory: impl Fn() -> Box<dyn MediaElement> + Send + Sync + 'static,
    ) -> Self {
        self.media_factory = Some(Box::new(factory));
        self
    }

    // ---- Driving ----

    /// Wait for and apply the next background result
    ///
    /// Returns `false` once the slot is torn down.
    pub async fn step(&mut self) -> bool {
        if self.is_torn_down() {
            return false;
        }
        match self.rx.recv().await {
            Some(message) => {
                self.handle_message(message);
                true
            }
            None => false,
        }
    }

    /// Apply every result that is already available, without waiting
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while !self.is_torn_down() {
            let Ok(message) = self.rx.try_recv() else {
                break;
            };
            self.handle_message(message);
            applied += 1;
        }
        applied
    }

    fn handle_message(&mut self, message: SlotMessage) {
        match message {
            SlotMessage::Fetched {
                generation,
                outcome,
            } => self.apply_fetch(generation, outcome),
            SlotMessage::MediaLoaded {
                generation,
                kind,
                result,
            } => self.apply_media(generation, kind, result),
            SlotMessage::RefreshTick { epoch } => self.on_refresh_tick(epoch),
            SlotMessage::HideControls { generation, epoch } => {
                self.on_hide_controls(generation, epoch)
            }
        }
    }

    // ---- Fetch cycle ----

    fn start_fetch(&mut self) {
        if self.retry.exhausted {
            debug!(
                "Retries exhausted for {}, not fetching until context changes",
                self.request.placement
            );
            return;
        }

        self.abort_fetch();
        self.fetch_generation += 1;
        let generation = self.fetch_generation;
        let api = self.api.clone();
        let request = self.request.clone();
        let policy: RetryPolicy = self.options.retry_policy();
        let tx = self.tx.clone();

        debug!("Starting fetch cycle {} for {}", generation, request.placement);
        let handle = tokio::spawn(async move {
            let outcome = fetch_with_retry(api.as_ref(), &request, &policy).await;
            // The slot may be gone; nothing to do then
            let _ = tx.send(SlotMessage::Fetched {
                generation,
                outcome,
            });
        });
        self.fetch_task = Some(handle.abort_handle());
    }

    fn apply_fetch(&mut self, generation: u64, outcome: FetchOutcome) {
        if generation != self.fetch_generation {
            debug!("Discarding stale fetch result (cycle {})", generation);
            return;
        }
        self.fetch_task = None;

        match outcome {
            FetchOutcome::Found(ad) => {
                self.retry = RetryState::default();
                self.commit(ad);
            }
            FetchOutcome::NoAd => {
                self.retry = RetryState::default();
                info!("No ad for placement {}", self.request.placement);
                self.clear_ad(SlotPhase::Empty);
            }
            FetchOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                error!(
                    "Giving up on placement {} after {} attempts: {}",
                    self.request.placement, attempts, last_error
                );
                self.retry = RetryState {
                    attempts,
                    exhausted: true,
                };
                self.refresh.stop();
                self.clear_ad(SlotPhase::Failed);
                self.callbacks.emit_error(&last_error);
            }
        }
    }

    /// Replace the current ad wholesale
    fn commit(&mut self, ad: AdCandidate) {
        info!(
            "Showing ad {} ({:?}) in {}",
            ad.slug,
            ad.ad_type(),
            self.request.placement
        );

        self.clear_ad(SlotPhase::Ready(Box::new(LoadedAd::new(ad))));
        self.impression.arm();

        if let SlotPhase::Ready(loaded) = &self.phase {
            self.callbacks.emit_load(&loaded.ad);
        }

        self.load_primary_media();
        if self.options.video_autoplay {
            self.autoplay();
        }
    }

    /// Drop the current ad and everything loaded for it
    fn clear_ad(&mut self, next: SlotPhase) {
        self.abort_media();
        self.abort_hide_timer();
        self.overlay.cancel();
        self.impression.reset();
        self.ad_generation += 1;

        // Dropping the old ad closes its player and revokes its blobs
        let previous = std::mem::replace(&mut self.phase, next);
        drop(previous);
    }

    // ---- Media ----

    fn load_primary_media(&mut self) {
        let target = match self.loaded_mut() {
            Some(loaded) => {
                let target = match &loaded.ad.creative {
                    Creative::Image { url, .. } => Some((MediaKind::Image, url.clone())),
                    Creative::Video {
                        thumbnail_url: Some(url),
                        ..
                    } => Some((MediaKind::Thumbnail, url.clone())),
                    _ => None,
                };
                if target.is_some() {
                    loaded.primary = MediaSlot::Loading;
                }
                target
            }
            None => None,
        };

        if let Some((kind, url)) = target {
            self.spawn_media(kind, url);
        }
    }

    fn spawn_media(&mut self, kind: MediaKind, url: String) {
        let generation = self.ad_generation;
        let api = self.api.clone();
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            let result = load_media(api.as_ref(), kind, &url).await;
            let _ = tx.send(SlotMessage::MediaLoaded {
                generation,
                kind,
                result,
            });
        });

        if kind == MediaKind::Video {
            self.abort_video_load();
            self.video_task = Some(handle.abort_handle());
        } else {
            self.media_tasks.retain(|task| !task.is_finished());
            self.media_tasks.push(handle.abort_handle());
        }
    }

    fn apply_media(&mut self, generation: u64, kind: MediaKind, result: Result<Vec<u8>>) {
        if generation != self.ad_generation {
            debug!("Discarding stale {} load", kind.as_str());
            return;
        }
        if kind == MediaKind::Video {
            self.video_task = None;
        }
        let SlotPhase::Ready(loaded) = &mut self.phase else {
            return;
        };

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to load {} for {}: {}", kind.as_str(), loaded.ad.slug, e);
                match kind {
                    MediaKind::Image | MediaKind::Thumbnail => loaded.primary = MediaSlot::Failed,
                    MediaKind::Video => {
                        loaded.video = MediaSlot::Failed;
                        if matches!(loaded.stage, VideoStage::Loading(_)) {
                            loaded.stage = VideoStage::Thumbnail { ended: false };
                        }
                    }
                }
                self.callbacks.emit_error(&e);
                return;
            }
        };

        let blob = self.blobs.create(bytes);
        match kind {
            MediaKind::Image | MediaKind::Thumbnail => loaded.primary = MediaSlot::Ready(blob),
            MediaKind::Video => {
                let stage =
                    std::mem::replace(&mut loaded.stage, VideoStage::Thumbnail { ended: false });
                match stage {
                    VideoStage::Loading(element) => {
                        let mut controller =
                            VideoController::new(element, self.options.player_settings());
                        controller.start(blob.url());
                        loaded.video = MediaSlot::Ready(blob);
                        loaded.stage = VideoStage::Active(controller);
                    }
                    other => {
                        // Playback was stopped or already started meanwhile
                        debug!("Video bytes arrived with no element waiting, releasing");
                        loaded.stage = other;
                    }
                }
            }
        }
    }

    // ---- Visibility and clicks ----

    /// Observer settings the host should use, while an impression is pending
    pub fn observer_config(&self) -> Option<&ObserverConfig> {
        self.impression
            .is_connected()
            .then(|| self.impression.config())
    }

    /// Forward a visibility observer entry
    pub fn observe(&mut self, entry: IntersectionEntry) {
        let SlotPhase::Ready(loaded) = &self.phase else {
            return;
        };
        if !self.impression.observe(entry) {
            return;
        }

        info!("Impression for {} in {}", loaded.ad.slug, self.request.placement);
        if self.options.tracking_enabled {
            fire_event(
                self.api.clone(),
                TrackingEvent::Impression,
                loaded.ad.slug.clone(),
                self.request.content_id.clone(),
            );
        }
        self.callbacks.emit_impression(&loaded.ad);
    }

    /// Primary-link click: records the click and returns where to navigate
    pub fn click(&mut self) -> Option<Navigation> {
        let SlotPhase::Ready(loaded) = &self.phase else {
            return None;
        };
        let navigation =
            self.clicks
                .track(&self.api, &loaded.ad, self.request.content_id.as_deref());
        self.callbacks.emit_click(&loaded.ad);
        navigation
    }

    // ---- Video ----

    /// Start playback of a video ad on `element`
    ///
    /// Returns `false` if the slot holds no idle video ad.
    pub fn activate_video(&mut self, element: Box<dyn MediaElement>) -> bool {
        let url = {
            let Some(loaded) = self.loaded_mut() else {
                return false;
            };
            let Creative::Video { url, .. } = &loaded.ad.creative else {
                return false;
            };
            if !matches!(loaded.stage, VideoStage::Thumbnail { .. }) {
                return false;
            }
            let url = url.clone();
            loaded.stage = VideoStage::Loading(element);
            loaded.video = MediaSlot::Loading;
            url
        };

        info!("Activating video for {}", self.request.placement);
        self.spawn_media(MediaKind::Video, url);
        true
    }

    fn autoplay(&mut self) {
        let element = match &self.media_factory {
            Some(factory) => factory(),
            None => {
                debug!("Autoplay requested without a media factory");
                return;
            }
        };
        self.activate_video(element);
    }

    pub fn player(&self) -> Option<&VideoController> {
        match &self.phase {
            SlotPhase::Ready(loaded) => match &loaded.stage {
                VideoStage::Active(controller) => Some(controller),
                _ => None,
            },
            _ => None,
        }
    }

    /// Transport controls of the active player
    pub fn player_mut(&mut self) -> Option<&mut VideoController> {
        match &mut self.loaded_mut()?.stage {
            VideoStage::Active(controller) => Some(controller),
            _ => None,
        }
    }

    /// Forward a media element notification
    pub fn media_event(&mut self, event: MediaEvent) {
        let Some(controller) = self.player_mut() else {
            debug!("Media event with no active player: {:?}", event);
            return;
        };
        let signal = controller.handle_event(event);
        let playing = controller.state().is_playing;

        match signal {
            PlayerSignal::None => {}
            PlayerSignal::Started => self.show_controls(playing),
            PlayerSignal::Paused => self.show_controls(false),
            PlayerSignal::Ended => self.close_video(true),
            PlayerSignal::Failed(message) => {
                self.close_video(false);
                if let Some(loaded) = self.loaded_mut() {
                    loaded.video = MediaSlot::Failed;
                }
                self.callbacks.emit_error(&AdSlotError::Media(message));
            }
        }
    }

    /// Pointer or touch activity over the player
    pub fn pointer_activity(&mut self) {
        if let Some(playing) = self.player().map(|c| c.state().is_playing) {
            self.show_controls(playing);
        }
    }

    /// Close the player and return to the thumbnail
    pub fn stop_video(&mut self) {
        self.close_video(false);
    }

    fn close_video(&mut self, ended: bool) {
        self.abort_hide_timer();
        self.abort_video_load();
        self.overlay.cancel();
        if let Some(loaded) = self.loaded_mut() {
            if matches!(loaded.stage, VideoStage::Thumbnail { .. }) {
                return;
            }
            // Drops the controller (detaching listeners) and revokes the video blob
            loaded.stage = VideoStage::Thumbnail { ended };
            loaded.video = MediaSlot::Idle;
        }
    }

    fn show_controls(&mut self, playing: bool) {
        let Some(controller) = self.player_mut() else {
            return;
        };
        controller.set_controls_visible(true);
        self.abort_hide_timer();
        if let Some(epoch) = self.overlay.activity(playing) {
            self.schedule_hide(epoch);
        }
    }

    fn schedule_hide(&mut self, epoch: u64) {
        let delay = self.overlay.delay();
        let generation = self.ad_generation;
        let tx = self.tx.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SlotMessage::HideControls { generation, epoch });
        });
        self.hide_timer = Some(handle.abort_handle());
    }

    fn on_hide_controls(&mut self, generation: u64, epoch: u64) {
        if generation != self.ad_generation {
            return;
        }
        let Some(playing) = self.player().map(|c| c.state().is_playing) else {
            return;
        };
        if self.overlay.should_hide(epoch, playing) {
            if let Some(controller) = self.player_mut() {
                controller.set_controls_visible(false);
            }
        }
    }

    // ---- Refresh ----

    fn start_refresh(&mut self) {
        match self.options.refresh_every() {
            Some(interval) if !self.retry.exhausted => self.refresh.start(interval, self.tx.clone()),
            _ => self.refresh.stop(),
        }
    }

    /// Turn auto-refresh on or off at runtime
    pub fn set_auto_refresh(&mut self, enabled: bool, interval: Duration) {
        self.options.auto_refresh = enabled;
        self.options.refresh_interval = interval;
        if matches!(self.phase, SlotPhase::Dismissed | SlotPhase::TornDown) {
            return;
        }
        self.start_refresh();
    }

    fn on_refresh_tick(&mut self, epoch: u64) {
        if !self.refresh.is_current(epoch) {
            return;
        }
        if self.fetch_task.is_some() {
            debug!("Refresh skipped, fetch still in flight");
            return;
        }
        if self.retry.exhausted || matches!(self.phase, SlotPhase::Dismissed) {
            return;
        }
        info!("Refreshing ad for {}", self.request.placement);
        self.start_fetch();
    }

    // ---- Context and lifecycle ----

    /// Point the slot at a new placement/content context
    ///
    /// Invalidates any fetch in flight, drops the current ad and clears
    /// retry exhaustion.
    pub fn set_context(&mut self, request: AdRequest) {
        if self.is_torn_down() {
            return;
        }
        if request == self.request && !matches!(self.phase, SlotPhase::Dismissed) {
            debug!("Context unchanged for {}", request.placement);
            return;
        }

        info!(
            "Context changed to {} (content: {:?})",
            request.placement, request.content_id
        );
        self.request = request;
        self.retry = RetryState::default();
        self.abort_fetch();
        self.clear_ad(SlotPhase::Loading);
        self.start_fetch();
        self.start_refresh();
    }

    /// Hide the slot locally at the user's request
    pub fn dismiss(&mut self) {
        if matches!(self.phase, SlotPhase::Dismissed | SlotPhase::TornDown) {
            return;
        }
        info!("Ad slot {} dismissed", self.request.placement);
        self.fetch_generation += 1;
        self.abort_fetch();
        self.refresh.stop();
        self.clear_ad(SlotPhase::Dismissed);
        self.impression.disconnect();
        self.callbacks.emit_close();
    }

    /// Release everything the slot holds. Idempotent; also run on drop.
    pub fn teardown(&mut self) {
        if self.is_torn_down() {
            return;
        }

        self.fetch_generation += 1;
        self.abort_fetch();
        self.refresh.stop();
        self.clear_ad(SlotPhase::TornDown);
        self.impression.disconnect();

        self.rx.close();
        while self.rx.try_recv().is_ok() {}

        metrics::slot_unmounted();
        let stats = self.blobs.stats();
        info!(
            "Ad slot {} torn down ({} blobs created, {} revoked)",
            self.request.placement, stats.created, stats.revoked
        );
    }

    fn abort_fetch(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
    }

    fn abort_media(&mut self) {
        for task in self.media_tasks.drain(..) {
            task.abort();
        }
        self.abort_video_load();
    }

    fn abort_video_load(&mut self) {
        if let Some(task) = self.video_task.take() {
            task.abort();
        }
    }

    fn abort_hide_timer(&mut self) {
        if let Some(task) = self.hide_timer.take() {
            task.abort();
        }
    }

    // ---- Presentation and inspection ----

    pub fn render(&self) -> Frame {
        let body = match &self.phase {
            SlotPhase::Loading => render::placeholder(&self.options, false),
            SlotPhase::Ready(loaded) => render::ad_view(loaded, &self.options),
            SlotPhase::Empty | SlotPhase::Failed | SlotPhase::Dismissed | SlotPhase::TornDown => {
                View::Nothing
            }
        };
        render::frame(&self.options, body)
    }

    pub fn status(&self) -> SlotStatus {
        match self.phase {
            SlotPhase::Loading => SlotStatus::Loading,
            SlotPhase::Empty => SlotStatus::Empty,
            SlotPhase::Failed => SlotStatus::Failed,
            SlotPhase::Ready(_) => SlotStatus::Ready,
            SlotPhase::Dismissed => SlotStatus::Dismissed,
            SlotPhase::TornDown => SlotStatus::TornDown,
        }
    }

    pub fn current_ad(&self) -> Option<&AdCandidate> {
        match &self.phase {
            SlotPhase::Ready(loaded) => Some(&loaded.ad),
            _ => None,
        }
    }

    pub fn request(&self) -> &AdRequest {
        &self.request
    }

    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    pub fn retry_state(&self) -> RetryState {
        self.retry
    }

    pub fn impression_recorded(&self) -> bool {
        self.impression.has_fired()
    }

    pub fn blob_stats(&self) -> BlobStats {
        self.blobs.stats()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_running()
    }

    pub fn has_pending_fetch(&self) -> bool {
        self.fetch_task.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        matches!(self.phase, SlotPhase::TornDown)
    }

    fn loaded_mut(&mut self) -> Option<&mut LoadedAd> {
        match &mut self.phase {
            SlotPhase::Ready(loaded) => Some(loaded.as_mut()),
            _ => None,
        }
    }
}

impl<A: AdApi> Drop for AdSlot<A> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<A: AdApi> fmt::Debug for AdSlot<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdSlot")
            .field("request", &self.request)
            .field("status", &self.status())
            .field("retry", &self.retry)
            .field("blobs", &self.blobs.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
