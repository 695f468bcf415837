//! In-memory doubles for the backend and the media element

use crate::ad::{AdApi, AdRecord, AdRequest, AdType};
use crate::error::{AdSlotError, Result};
use crate::player::MediaElement;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) fn record(slug: &str, ad_type: AdType) -> AdRecord {
    AdRecord {
        id: 1,
        title: format!("{slug} title"),
        slug: slug.to_string(),
        ad_type,
        image_url: None,
        image_alt: None,
        video_url: None,
        video_thumbnail_url: None,
        html_content: None,
        link_url: Some("https://advertiser.example.com/landing".to_string()),
        open_in_new_tab: true,
        cta_text: Some("Learn more".to_string()),
        placement: "sidebar_top".to_string(),
    }
}

pub(crate) fn image_record(slug: &str) -> AdRecord {
    AdRecord {
        image_url: Some(format!("https://cdn.example.com/{slug}.png")),
        ..record(slug, AdType::Image)
    }
}

pub(crate) fn video_record(slug: &str) -> AdRecord {
    AdRecord {
        video_url: Some(format!("https://cdn.example.com/{slug}.mp4")),
        video_thumbnail_url: Some(format!("https://cdn.example.com/{slug}.jpg")),
        ..record(slug, AdType::Video)
    }
}

pub(crate) fn html_record(slug: &str, html: &str) -> AdRecord {
    AdRecord {
        html_content: Some(html.to_string()),
        ..record(slug, AdType::Html)
    }
}

/// Scripted [`AdApi`]: answers fetches from a queue and records tracking calls
#[derive(Default)]
pub(crate) struct ScriptedApi {
    responses: Mutex<VecDeque<Result<Option<AdRecord>>>>,
    fetch_delay: Mutex<Duration>,
    fetch_calls: AtomicUsize,
    impressions: Mutex<Vec<(String, Option<String>)>>,
    clicks: Mutex<Vec<(String, Option<String>)>>,
    failing_media: Mutex<HashSet<String>>,
    media_calls: AtomicUsize,
    fail_tracking: AtomicBool,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_ad(&self, record: AdRecord) {
        self.responses.lock().unwrap().push_back(Ok(Some(record)));
    }

    pub(crate) fn push_empty(&self) {
        self.responses.lock().unwrap().push_back(Ok(None));
    }

    pub(crate) fn push_error(&self, error: AdSlotError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub(crate) fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = delay;
    }

    pub(crate) fn fail_media(&self, url: &str) {
        self.failing_media.lock().unwrap().insert(url.to_string());
    }

    pub(crate) fn fail_tracking(&self) {
        self.fail_tracking.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn media_calls(&self) -> usize {
        self.media_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn impressions(&self) -> Vec<(String, Option<String>)> {
        self.impressions.lock().unwrap().clone()
    }

    pub(crate) fn clicks(&self) -> Vec<(String, Option<String>)> {
        self.clicks.lock().unwrap().clone()
    }

    fn tracking_result(&self) -> Result<()> {
        if self.fail_tracking.load(Ordering::SeqCst) {
            Err(AdSlotError::Status(500))
        } else {
            Ok(())
        }
    }
}

impl AdApi for ScriptedApi {
    async fn fetch_ad(&self, _request: &AdRequest) -> Result<Option<AdRecord>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let response = self.responses.lock().unwrap().pop_front().unwrap_or(Ok(None));
        let delay = *self.fetch_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }

    async fn record_impression(&self, slug: &str, content_id: Option<&str>) -> Result<()> {
        self.impressions
            .lock()
            .unwrap()
            .push((slug.to_string(), content_id.map(str::to_string)));
        self.tracking_result()
    }

    async fn record_click(&self, slug: &str, content_id: Option<&str>) -> Result<()> {
        self.clicks
            .lock()
            .unwrap()
            .push((slug.to_string(), content_id.map(str::to_string)));
        self.tracking_result()
    }

    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>> {
        self.media_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_media.lock().unwrap().contains(url) {
            return Err(AdSlotError::Media(format!("{url} returned status 404")));
        }
        Ok(url.as_bytes().to_vec())
    }
}

/// Requests a [`FakeElement`] received from the controller
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ElementRequest {
    Attach,
    Detach,
    Source(String),
    Play,
    Pause,
    Seek(f64),
    Volume(f64),
    Muted(bool),
    Rate(f64),
    Loop(bool),
    EnterFullscreen,
    ExitFullscreen,
    EnterPip,
    ExitPip,
}

/// Media element double. Clones share the request log.
#[derive(Clone, Default)]
pub(crate) struct FakeElement {
    pub(crate) log: Arc<Mutex<Vec<ElementRequest>>>,
    pub(crate) refuse_play: bool,
    pub(crate) refuse_fullscreen: bool,
    pub(crate) refuse_pip: bool,
}

impl FakeElement {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn requests(&self) -> Vec<ElementRequest> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn last_seek(&self) -> Option<f64> {
        self.requests().into_iter().rev().find_map(|r| match r {
            ElementRequest::Seek(t) => Some(t),
            _ => None,
        })
    }

    pub(crate) fn count(&self, request: &ElementRequest) -> usize {
        self.requests().iter().filter(|r| *r == request).count()
    }

    fn push(&self, request: ElementRequest) {
        self.log.lock().unwrap().push(request);
    }

    fn refusal(&self, refused: bool, what: &str) -> Result<()> {
        if refused {
            Err(AdSlotError::Platform(format!("{what} not allowed")))
        } else {
            Ok(())
        }
    }
}

impl MediaElement for FakeElement {
    fn attach_listeners(&mut self) {
        self.push(ElementRequest::Attach);
    }

    fn detach_listeners(&mut self) {
        self.push(ElementRequest::Detach);
    }

    fn set_source(&mut self, url: &str) {
        self.push(ElementRequest::Source(url.to_string()));
    }

    fn play(&mut self) -> Result<()> {
        self.push(ElementRequest::Play);
        self.refusal(self.refuse_play, "play")
    }

    fn pause(&mut self) -> Result<()> {
        self.push(ElementRequest::Pause);
        Ok(())
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.push(ElementRequest::Seek(seconds));
    }

    fn set_volume(&mut self, volume: f64) {
        self.push(ElementRequest::Volume(volume));
    }

    fn set_muted(&mut self, muted: bool) {
        self.push(ElementRequest::Muted(muted));
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.push(ElementRequest::Rate(rate));
    }

    fn set_loop(&mut self, looping: bool) {
        self.push(ElementRequest::Loop(looping));
    }

    fn request_fullscreen(&mut self) -> Result<()> {
        self.push(ElementRequest::EnterFullscreen);
        self.refusal(self.refuse_fullscreen, "fullscreen")
    }

    fn exit_fullscreen(&mut self) -> Result<()> {
        self.push(ElementRequest::ExitFullscreen);
        Ok(())
    }

    fn request_picture_in_picture(&mut self) -> Result<()> {
        self.push(ElementRequest::EnterPip);
        self.refusal(self.refuse_pip, "picture-in-picture")
    }

    fn exit_picture_in_picture(&mut self) -> Result<()> {
        self.push(ElementRequest::ExitPip);
        Ok(())
    }
}

/// Let spawned fire-and-forget tasks run
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
