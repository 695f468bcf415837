use super::*;
use crate::ad::AdRecord;
use crate::player::PlayerPhase;
use crate::render::View;
use crate::test_support::{
    ElementRequest, FakeElement, ScriptedApi, html_record, image_record, settle, video_record,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

fn request() -> AdRequest {
    AdRequest::new("sidebar_top", Some("post-1".to_string()))
}

fn mount(api: &Arc<ScriptedApi>, options: WidgetOptions) -> AdSlot<ScriptedApi> {
    AdSlot::mount(api.clone(), request(), options, Callbacks::new())
}

fn api_with(records: Vec<AdRecord>) -> Arc<ScriptedApi> {
    let api = Arc::new(ScriptedApi::new());
    for record in records {
        api.push_ad(record);
    }
    api
}

async fn steps(slot: &mut AdSlot<ScriptedApi>, n: usize) {
    for _ in 0..n {
        assert!(slot.step().await, "slot stopped early");
    }
}

fn counter() -> (Arc<AtomicUsize>, impl Fn(&AdCandidate) + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let handle = count.clone();
    (count, move |_: &AdCandidate| {
        handle.fetch_add(1, Ordering::SeqCst);
    })
}

#[tokio::test(start_paused = true)]
async fn test_image_ad_renders_from_blob_after_placeholder() {
    let api = api_with(vec![image_record("spring-sale")]);
    let (loads, on_load) = counter();
    let mut slot = AdSlot::mount(
        api.clone(),
        request(),
        WidgetOptions::default(),
        Callbacks::new().on_load(on_load),
    );

    assert_eq!(slot.status(), SlotStatus::Loading);
    assert!(matches!(slot.render().body, View::Placeholder(ref p) if !p.failed));

    steps(&mut slot, 1).await;
    assert_eq!(slot.status(), SlotStatus::Ready);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    // Image bytes still loading
    assert!(matches!(slot.render().body, View::Placeholder(_)));

    steps(&mut slot, 1).await;
    let frame = slot.render();
    assert_eq!(frame.label.as_deref(), Some("Advertisement"));
    let View::Image(image) = frame.body else {
        panic!("expected an image view, got {:?}", frame.body);
    };
    assert!(image.src.starts_with("blob:adslot/"));
    assert!(!image.src.contains("cdn.example.com"));
    assert_eq!(image.alt, "spring-sale title");
    assert_eq!(image.cta_text.as_deref(), Some("Learn more"));
    assert_eq!(slot.blob_stats().live, 1);
}

#[tokio::test(start_paused = true)]
async fn test_impression_fires_exactly_once() {
    let api = api_with(vec![image_record("spring-sale")]);
    let (impressions, on_impression) = counter();
    let mut slot = AdSlot::mount(
        api.clone(),
        request(),
        WidgetOptions::default(),
        Callbacks::new().on_impression(on_impression),
    );
    steps(&mut slot, 2).await;
    assert!(slot.observer_config().is_some());

    slot.observe(IntersectionEntry::visible(0.2));
    assert!(!slot.impression_recorded());

    for _ in 0..5 {
        slot.observe(IntersectionEntry::visible(0.8));
        slot.observe(IntersectionEntry::hidden());
    }
    settle().await;

    assert!(slot.impression_recorded());
    assert!(slot.observer_config().is_none());
    assert_eq!(impressions.load(Ordering::SeqCst), 1);
    assert_eq!(
        api.impressions(),
        vec![("spring-sale".to_string(), Some("post-1".to_string()))]
    );
}

#[tokio::test(start_paused = true)]
async fn test_click_returns_navigation_and_tracks() {
    let api = api_with(vec![image_record("spring-sale")]);
    let (clicks, on_click) = counter();
    let mut slot = AdSlot::mount(
        api.clone(),
        request(),
        WidgetOptions::default(),
        Callbacks::new().on_click(on_click),
    );
    steps(&mut slot, 2).await;

    let navigation = slot.click().expect("ad has a link");
    assert_eq!(navigation.url, "https://advertiser.example.com/landing");
    assert!(navigation.new_tab);
    // Callback is synchronous
    assert_eq!(clicks.load(Ordering::SeqCst), 1);

    settle().await;
    assert_eq!(
        api.clicks(),
        vec![("spring-sale".to_string(), Some("post-1".to_string()))]
    );
}

#[tokio::test(start_paused = true)]
async fn test_click_navigates_even_when_tracking_fails() {
    let api = api_with(vec![image_record("spring-sale")]);
    api.fail_tracking();
    let mut slot = mount(&api, WidgetOptions::default());
    steps(&mut slot, 2).await;

    assert!(slot.click().is_some());
    settle().await;
    assert_eq!(api.clicks().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_tracking_disabled_sends_nothing() {
    let api = api_with(vec![image_record("quiet")]);
    let options = WidgetOptions {
        tracking_enabled: false,
        ..WidgetOptions::default()
    };
    let mut slot = mount(&api, options);
    steps(&mut slot, 2).await;

    slot.observe(IntersectionEntry::visible(1.0));
    assert!(slot.click().is_some());
    settle().await;

    assert!(slot.impression_recorded());
    assert!(api.impressions().is_empty());
    assert!(api.clicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_no_ad_renders_nothing_and_never_tracks() {
    let api = Arc::new(ScriptedApi::new());
    api.push_empty();
    let mut slot = mount(&api, WidgetOptions::default());
    steps(&mut slot, 1).await;

    assert_eq!(slot.status(), SlotStatus::Empty);
    let frame = slot.render();
    assert!(frame.is_empty());
    assert_eq!(frame.label, None);

    slot.observe(IntersectionEntry::visible(1.0));
    assert_eq!(slot.click(), None);
    settle().await;

    assert!(api.impressions().is_empty());
    assert!(api.clicks().is_empty());
    assert_eq!(api.fetch_calls(), 1);
    assert_eq!(slot.blob_stats().created, 0);
}

#[tokio::test(start_paused = true)]
async fn test_retries_until_success_showing_placeholder() {
    let api = Arc::new(ScriptedApi::new());
    api.push_error(AdSlotError::Status(503));
    api.push_error(AdSlotError::Decode("not json".to_string()));
    api.push_ad(image_record("third-time"));
    let mut slot = mount(&api, WidgetOptions::default());

    assert!(matches!(slot.render().body, View::Placeholder(_)));
    steps(&mut slot, 1).await;

    assert_eq!(api.fetch_calls(), 3);
    assert_eq!(slot.status(), SlotStatus::Ready);
    assert_eq!(slot.retry_state(), RetryState::default());
    assert_eq!(slot.current_ad().map(|ad| ad.slug.as_str()), Some("third-time"));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_options_are_reported_on_mount() {
    let api = api_with(vec![image_record("spring-sale")]);
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    let options = WidgetOptions {
        visibility_threshold: 1.5,
        ..WidgetOptions::default()
    };
    let mut slot = AdSlot::mount(
        api.clone(),
        request(),
        options,
        Callbacks::new().on_error(move |e| sink.lock().unwrap().push(e.to_string())),
    );

    {
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("visibility_threshold"));
    }

    steps(&mut slot, 1).await;
    assert_eq!(slot.status(), SlotStatus::Ready);
    assert_eq!(errors.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_blocks_attempts_until_context_changes() {
    let api = Arc::new(ScriptedApi::new());
    for _ in 0..3 {
        api.push_error(AdSlotError::Status(500));
    }
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();
    let mut slot = AdSlot::mount(
        api.clone(),
        request(),
        WidgetOptions::default(),
        Callbacks::new().on_error(move |e| sink.lock().unwrap().push(e.to_string())),
    );

    steps(&mut slot, 1).await;
    assert_eq!(slot.status(), SlotStatus::Failed);
    assert!(slot.render().is_empty());
    assert_eq!(
        slot.retry_state(),
        RetryState {
            attempts: 3,
            exhausted: true
        }
    );
    assert_eq!(errors.lock().unwrap().len(), 1);

    // Neither refresh nor the same context may start another cycle
    slot.set_auto_refresh(true, Duration::from_secs(1));
    assert!(!slot.is_refreshing());
    slot.set_context(request());
    tokio::time::sleep(Duration::from_secs(30)).await;
    slot.drain();
    assert_eq!(api.fetch_calls(), 3);

    api.push_ad(image_record("new-page"));
    slot.set_context(AdRequest::new("sidebar_top", Some("post-2".to_string())));
    assert_eq!(slot.retry_state(), RetryState::default());
    steps(&mut slot, 1).await;

    assert_eq!(api.fetch_calls(), 4);
    assert_eq!(slot.current_ad().map(|ad| ad.slug.as_str()), Some("new-page"));
}

#[tokio::test(start_paused = true)]
async fn test_late_result_after_context_change_is_discarded() {
    let api = api_with(vec![image_record("old-page"), image_record("new-page")]);
    let mut slot = mount(&api, WidgetOptions::default());

    // First result is queued but not yet applied
    settle().await;
    slot.set_context(AdRequest::new("sidebar_top", Some("post-2".to_string())));

    steps(&mut slot, 1).await;
    assert_eq!(slot.status(), SlotStatus::Loading);
    assert!(slot.current_ad().is_none());

    steps(&mut slot, 1).await;
    assert_eq!(slot.current_ad().map(|ad| ad.slug.as_str()), Some("new-page"));
}

#[tokio::test(start_paused = true)]
async fn test_unmount_during_fetch_applies_nothing() {
    let api = api_with(vec![image_record("too-late")]);
    api.set_fetch_delay(Duration::from_secs(2));
    let (loads, on_load) = counter();
    let mut slot = AdSlot::mount(
        api.clone(),
        request(),
        WidgetOptions::default(),
        Callbacks::new().on_load(on_load),
    );
    settle().await;
    assert!(slot.has_pending_fetch());

    slot.teardown();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(!slot.step().await);
    assert_eq!(slot.drain(), 0);
    assert!(slot.current_ad().is_none());
    assert!(slot.render().is_empty());
    assert_eq!(loads.load(Ordering::SeqCst), 0);
    assert_eq!(slot.blob_stats().created, 0);
}

#[tokio::test(start_paused = true)]
async fn test_media_failure_falls_back_to_placeholder() {
    let api = api_with(vec![image_record("broken")]);
    api.fail_media("https://cdn.example.com/broken.png");
    let errors = Arc::new(AtomicUsize::new(0));
    let count = errors.clone();
    let mut slot = AdSlot::mount(
        api.clone(),
        request(),
        WidgetOptions::default(),
        Callbacks::new().on_error(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        }),
    );
    steps(&mut slot, 2).await;

    assert!(matches!(slot.render().body, View::Placeholder(ref p) if p.failed));
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(slot.blob_stats().created, 0);
}

#[tokio::test(start_paused = true)]
async fn test_html_ad_is_sanitised() {
    let api = api_with(vec![html_record(
        "promo",
        "<p onclick=\"steal()\">Hi</p><script>alert(1)</script>",
    )]);
    let mut slot = mount(&api, WidgetOptions::default());
    steps(&mut slot, 1).await;

    let View::Html(html) = slot.render().body else {
        panic!("expected html view");
    };
    assert_eq!(html.markup, "<p>Hi</p>");
    assert_eq!(api.media_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stopping_while_video_loads_cancels_the_load() {
    let api = api_with(vec![video_record("launch")]);
    let mut slot = mount(&api, WidgetOptions::default());
    steps(&mut slot, 2).await;
    assert_eq!(api.media_calls(), 1);

    let element = FakeElement::new();
    assert!(slot.activate_video(Box::new(element.clone())));
    slot.stop_video();

    settle().await;
    assert_eq!(slot.drain(), 0);
    assert_eq!(api.media_calls(), 1);
    assert!(matches!(slot.render().body, View::VideoThumbnail(ref t) if !t.loading));
    let stats = slot.blob_stats();
    assert_eq!((stats.created, stats.live), (1, 1));
    assert!(element.requests().is_empty());

    // Can be activated again afterwards
    assert!(slot.activate_video(Box::new(element.clone())));
    steps(&mut slot, 1).await;
    assert!(slot.player().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_video_playback_and_auto_hide() {
    let api = api_with(vec![video_record("launch")]);
    let mut slot = mount(&api, WidgetOptions::default());
    steps(&mut slot, 2).await;

    let View::VideoThumbnail(thumbnail) = slot.render().body else {
        panic!("expected thumbnail");
    };
    assert!(thumbnail.poster.is_some());
    assert!(!thumbnail.loading);

    let element = FakeElement::new();
    assert!(slot.activate_video(Box::new(element.clone())));
    assert!(matches!(slot.render().body, View::VideoThumbnail(ref t) if t.loading));
    // Already activated
    assert!(!slot.activate_video(Box::new(FakeElement::new())));

    steps(&mut slot, 1).await;
    let requests = element.requests();
    assert_eq!(requests[0], ElementRequest::Attach);
    assert!(matches!(&requests[1], ElementRequest::Source(url) if url.starts_with("blob:adslot/")));
    assert!(requests.contains(&ElementRequest::Play));
    assert_eq!(slot.blob_stats().live, 2);

    slot.media_event(MediaEvent::DurationChange(30.0));
    slot.media_event(MediaEvent::Playing);
    slot.media_event(MediaEvent::TimeUpdate(12.0));

    let View::VideoPlayer(player) = slot.render().body else {
        panic!("expected player");
    };
    assert_eq!(player.phase, PlayerPhase::Playing);
    assert!((player.progress - 0.4).abs() < 1e-9);
    assert_eq!(player.elapsed, "0:12");
    assert_eq!(player.duration, "0:30");
    assert!(player.controls.visible);

    // Hide timer fires after three idle seconds
    let before = tokio::time::Instant::now();
    steps(&mut slot, 1).await;
    assert!(before.elapsed() >= Duration::from_secs(3));
    assert!(!slot.player().unwrap().state().controls_visible);

    slot.pointer_activity();
    assert!(slot.player().unwrap().state().controls_visible);

    let target = slot.player_mut().unwrap().skip_forward();
    assert_eq!(target, Some(22.0));
    assert_eq!(element.last_seek(), Some(22.0));

    // Paused: controls stay up
    slot.media_event(MediaEvent::Pause);
    tokio::time::sleep(Duration::from_secs(10)).await;
    slot.drain();
    assert!(slot.player().unwrap().state().controls_visible);

    slot.media_event(MediaEvent::Ended);
    assert!(slot.player().is_none());
    assert!(matches!(slot.render().body, View::VideoThumbnail(ref t) if t.ended));
    assert_eq!(element.requests().last(), Some(&ElementRequest::Detach));
    assert_eq!(slot.blob_stats().live, 1);
}

#[tokio::test(start_paused = true)]
async fn test_autoplay_uses_media_factory() {
    let api = api_with(vec![video_record("launch")]);
    let element = FakeElement::new();
    let factory_element = element.clone();
    let options = WidgetOptions {
        video_autoplay: true,
        ..WidgetOptions::default()
    };
    let mut slot = mount(&api, options)
        .with_media_factory(move || Box::new(factory_element.clone()) as Box<dyn MediaElement>);

    // Fetch, then thumbnail and video loads in either order
    steps(&mut slot, 3).await;

    assert!(slot.player().is_some());
    assert!(element.requests().contains(&ElementRequest::Muted(true)));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_replaces_ad_and_resets_impression() {
    let api = api_with(vec![image_record("first"), image_record("second")]);
    let options = WidgetOptions {
        auto_refresh: true,
        refresh_interval: Duration::from_secs(30),
        ..WidgetOptions::default()
    };
    let mut slot = mount(&api, options);
    steps(&mut slot, 2).await;

    slot.observe(IntersectionEntry::visible(1.0));
    assert!(slot.impression_recorded());

    // Tick, fetch, image
    steps(&mut slot, 3).await;
    assert_eq!(slot.current_ad().map(|ad| ad.slug.as_str()), Some("second"));
    assert!(!slot.impression_recorded());
    assert!(slot.observer_config().is_some());
    assert!(matches!(slot.render().body, View::Image(_)));

    let stats = slot.blob_stats();
    assert_eq!((stats.created, stats.revoked, stats.live), (2, 1, 1));

    slot.observe(IntersectionEntry::visible(1.0));
    settle().await;
    let slugs: Vec<_> = api.impressions().into_iter().map(|(slug, _)| slug).collect();
    assert_eq!(slugs, vec!["first", "second"]);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_during_playback_returns_to_thumbnail() {
    let api = api_with(vec![video_record("first"), video_record("second")]);
    let options = WidgetOptions {
        auto_refresh: true,
        refresh_interval: Duration::from_secs(30),
        ..WidgetOptions::default()
    };
    let mut slot = mount(&api, options);
    steps(&mut slot, 2).await;

    let element = FakeElement::new();
    slot.activate_video(Box::new(element.clone()));
    steps(&mut slot, 1).await;
    slot.media_event(MediaEvent::Playing);

    // Hide timer, then tick, fetch and thumbnail
    steps(&mut slot, 4).await;
    assert_eq!(slot.current_ad().map(|ad| ad.slug.as_str()), Some("second"));
    assert!(slot.player().is_none());
    assert!(matches!(slot.render().body, View::VideoThumbnail(ref t) if !t.ended));
    assert_eq!(element.requests().last(), Some(&ElementRequest::Detach));
}

#[tokio::test(start_paused = true)]
async fn test_no_blob_leaks_across_refresh_cycles() {
    let api = api_with((0..5).map(|i| image_record(&format!("ad-{i}"))).collect());
    let options = WidgetOptions {
        auto_refresh: true,
        refresh_interval: Duration::from_secs(10),
        ..WidgetOptions::default()
    };
    let mut slot = mount(&api, options);
    steps(&mut slot, 2).await;
    for _ in 0..4 {
        steps(&mut slot, 3).await;
    }
    assert_eq!(slot.blob_stats().created, 5);
    assert_eq!(slot.blob_stats().live, 1);

    slot.teardown();
    let stats = slot.blob_stats();
    assert_eq!(stats.created, stats.revoked);
    assert_eq!(stats.live, 0);
    assert!(!slot.is_refreshing());
}

#[tokio::test(start_paused = true)]
async fn test_disabling_refresh_stops_fetches() {
    let api = api_with(vec![image_record("only")]);
    let options = WidgetOptions {
        auto_refresh: true,
        refresh_interval: Duration::from_secs(5),
        ..WidgetOptions::default()
    };
    let mut slot = mount(&api, options);
    steps(&mut slot, 2).await;

    slot.set_auto_refresh(false, Duration::from_secs(5));
    tokio::time::sleep(Duration::from_secs(60)).await;
    slot.drain();

    assert_eq!(api.fetch_calls(), 1);
    assert_eq!(slot.current_ad().map(|ad| ad.slug.as_str()), Some("only"));
}

#[tokio::test(start_paused = true)]
async fn test_dismiss_hides_and_stops_refresh() {
    let api = api_with(vec![image_record("closable")]);
    let closed = Arc::new(AtomicUsize::new(0));
    let count = closed.clone();
    let options = WidgetOptions {
        show_close: true,
        auto_refresh: true,
        ..WidgetOptions::default()
    };
    let mut slot = AdSlot::mount(
        api.clone(),
        request(),
        options,
        Callbacks::new().on_close(move || {
            count.fetch_add(1, Ordering::SeqCst);
        }),
    );
    steps(&mut slot, 2).await;
    assert!(slot.render().dismissible);

    slot.dismiss();
    slot.dismiss();

    assert_eq!(closed.load(Ordering::SeqCst), 1);
    assert_eq!(slot.status(), SlotStatus::Dismissed);
    assert!(slot.render().is_empty());
    assert!(!slot.is_refreshing());
    assert_eq!(slot.blob_stats().live, 0);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_closes_player_and_is_idempotent() {
    let api = api_with(vec![video_record("launch")]);
    let mut slot = mount(&api, WidgetOptions::default());
    steps(&mut slot, 2).await;

    let element = FakeElement::new();
    slot.activate_video(Box::new(element.clone()));
    steps(&mut slot, 1).await;
    slot.media_event(MediaEvent::Playing);
    slot.player_mut().unwrap().toggle_fullscreen();
    slot.media_event(MediaEvent::FullscreenChange(true));

    slot.teardown();
    slot.teardown();

    assert!(slot.is_torn_down());
    assert_eq!(element.count(&ElementRequest::Detach), 1);
    assert_eq!(element.count(&ElementRequest::ExitFullscreen), 1);
    assert_eq!(slot.blob_stats().live, 0);
    assert!(slot.observer_config().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_drop_tears_down() {
    let api = api_with(vec![video_record("launch")]);
    let mut slot = mount(&api, WidgetOptions::default());
    steps(&mut slot, 2).await;

    let element = FakeElement::new();
    slot.activate_video(Box::new(element.clone()));
    steps(&mut slot, 1).await;

    drop(slot);
    assert_eq!(element.requests().last(), Some(&ElementRequest::Detach));
}
