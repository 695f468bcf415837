use crate::error::{AdSlotError, Result};
use crate::player::state::{MediaEvent, PLAYBACK_RATES, PlaybackState, PlayerPhase};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Platform media element, including its fullscreen and picture-in-picture host
///
/// Every method is a request. The element reports what actually happened
/// through [`MediaEvent`]s, which the host forwards to
/// [`VideoController::handle_event`].
pub trait MediaElement: Send {
    /// Start delivering events (media, fullscreen and PiP change listeners)
    fn attach_listeners(&mut self);
    /// Stop delivering events
    fn detach_listeners(&mut self);
    fn set_source(&mut self, url: &str);
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn set_current_time(&mut self, seconds: f64);
    fn set_volume(&mut self, volume: f64);
    fn set_muted(&mut self, muted: bool);
    fn set_playback_rate(&mut self, rate: f64);
    fn set_loop(&mut self, looping: bool);
    fn request_fullscreen(&mut self) -> Result<()>;
    fn exit_fullscreen(&mut self) -> Result<()>;
    fn request_picture_in_picture(&mut self) -> Result<()>;
    fn exit_picture_in_picture(&mut self) -> Result<()>;
}

/// Video options a controller is created with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSettings {
    pub muted: bool,
    pub looping: bool,
    pub allow_pip: bool,
    pub allow_fullscreen: bool,
    pub skip_step: Duration,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            muted: true,
            looping: false,
            allow_pip: true,
            allow_fullscreen: true,
            skip_step: Duration::from_secs(10),
        }
    }
}

/// What an element event meant for the rest of the slot
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerSignal {
    None,
    /// Playback is running (again)
    Started,
    Paused,
    /// End of stream without looping
    Ended,
    Failed(String),
}

/// State machine over one media element
///
/// `Thumbnail → Loading → Playing ⇄ Paused`, `Buffering` while the element
/// waits for data, `Ended` at end of stream. Requests never touch the
/// displayed state directly; the platform may defer or refuse them.
pub struct VideoController {
    element: Box<dyn MediaElement>,
    settings: PlayerSettings,
    state: PlaybackState,
    phase: PlayerPhase,
    listening: bool,
}

impl VideoController {
    pub fn new(element: Box<dyn MediaElement>, settings: PlayerSettings) -> Self {
        Self {
            element,
            settings,
            state: PlaybackState::new(settings.muted),
            phase: PlayerPhase::Thumbnail,
            listening: false,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Attach listeners, load `source_url` and request playback
    pub fn start(&mut self, source_url: &str) {
        self.element.attach_listeners();
        self.listening = true;

        self.element.set_source(source_url);
        self.element.set_muted(self.settings.muted);
        self.element.set_loop(self.settings.looping);
        self.phase = PlayerPhase::Loading;

        info!("Starting video playback from {}", source_url);
        if let Err(e) = self.element.play() {
            // Typically an autoplay policy refusal; the user can press play
            warn!("Play request refused: {}", e);
            self.phase = PlayerPhase::Paused;
        }
    }

    /// Reconcile displayed state with an element notification
    pub fn handle_event(&mut self, event: MediaEvent) -> PlayerSignal {
        match event {
            MediaEvent::Play => {
                self.state.is_playing = true;
                if self.phase != PlayerPhase::Buffering {
                    self.phase = PlayerPhase::Playing;
                }
                PlayerSignal::Started
            }
            MediaEvent::Playing => {
                self.state.is_playing = true;
                self.state.is_buffering = false;
                self.phase = PlayerPhase::Playing;
                PlayerSignal::Started
            }
            MediaEvent::Pause => {
                self.state.is_playing = false;
                if self.phase != PlayerPhase::Ended {
                    self.phase = PlayerPhase::Paused;
                }
                PlayerSignal::Paused
            }
            MediaEvent::Waiting => {
                self.state.is_buffering = true;
                if matches!(self.phase, PlayerPhase::Playing | PlayerPhase::Loading) {
                    self.phase = PlayerPhase::Buffering;
                }
                PlayerSignal::None
            }
            MediaEvent::CanPlay => {
                self.state.is_buffering = false;
                if self.phase == PlayerPhase::Buffering {
                    self.phase = if self.state.is_playing {
                        PlayerPhase::Playing
                    } else {
                        PlayerPhase::Paused
                    };
                }
                PlayerSignal::None
            }
            MediaEvent::TimeUpdate(t) => {
                if t.is_finite() {
                    self.state.current_time = t.max(0.0);
                }
                PlayerSignal::None
            }
            MediaEvent::DurationChange(d) => {
                // Live or unknown durations disable seeking
                self.state.duration = if d.is_finite() && d > 0.0 { d } else { 0.0 };
                PlayerSignal::None
            }
            MediaEvent::VolumeChange { volume, muted } => {
                let volume = if volume.is_finite() {
                    volume.clamp(0.0, 1.0)
                } else {
                    self.state.volume
                };
                self.state.volume = volume;
                self.state.is_muted = muted || volume == 0.0;
                PlayerSignal::None
            }
            MediaEvent::RateChange(rate) => {
                if rate.is_finite() && rate > 0.0 {
                    self.state.playback_rate = rate;
                }
                PlayerSignal::None
            }
            MediaEvent::Ended => {
                if self.settings.looping {
                    debug!("Video ended, looping");
                    self.element.set_current_time(0.0);
                    if let Err(e) = self.element.play() {
                        warn!("Loop restart refused: {}", e);
                    }
                    self.phase = PlayerPhase::Playing;
                    PlayerSignal::None
                } else {
                    info!("Video ended");
                    self.state.is_playing = false;
                    self.state.is_buffering = false;
                    self.phase = PlayerPhase::Ended;
                    PlayerSignal::Ended
                }
            }
            MediaEvent::FullscreenChange(active) => {
                self.state.is_fullscreen = active;
                PlayerSignal::None
            }
            MediaEvent::PipChange(active) => {
                self.state.is_pip = active;
                PlayerSignal::None
            }
            MediaEvent::Error(msg) => {
                warn!("Media element error: {}", msg);
                self.state.is_playing = false;
                self.state.is_buffering = false;
                PlayerSignal::Failed(msg)
            }
        }
    }

    /// Request play or pause, whichever the element is not doing
    pub fn toggle_play(&mut self) {
        let result = if self.state.is_playing {
            self.element.pause()
        } else {
            if self.phase == PlayerPhase::Ended {
                self.element.set_current_time(0.0);
            }
            self.element.play()
        };

        if let Err(e) = result {
            warn!("Play/pause request refused: {}", e);
        }
    }

    /// Seek to an absolute time, clamped to `[0, duration]`
    ///
    /// Returns the requested target, or `None` while the duration is
    /// unknown. The displayed time follows once the element reports it.
    pub fn seek_to(&mut self, seconds: f64) -> Option<f64> {
        if self.state.duration <= 0.0 {
            debug!("Seek ignored, duration unknown");
            return None;
        }
        let target = self.state.clamp_time(seconds);
        self.element.set_current_time(target);
        Some(target)
    }

    /// Seek to a fraction of the duration (progress bar position)
    ///
    /// Does nothing until the duration is known.
    pub fn seek_to_fraction(&mut self, fraction: f64) -> Option<f64> {
        if self.state.duration <= 0.0 || !fraction.is_finite() {
            return None;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        self.seek_to(fraction * self.state.duration)
    }

    /// Skip by `delta` seconds (negative skips back), clamped
    pub fn skip(&mut self, delta: f64) -> Option<f64> {
        self.seek_to(self.state.current_time + delta)
    }

    pub fn skip_forward(&mut self) -> Option<f64> {
        self.skip(self.settings.skip_step.as_secs_f64())
    }

    pub fn skip_backward(&mut self) -> Option<f64> {
        self.skip(-self.settings.skip_step.as_secs_f64())
    }

    /// Set volume in `[0, 1]`. Zero mutes, anything else unmutes.
    pub fn set_volume(&mut self, volume: f64) {
        if !volume.is_finite() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.element.set_volume(volume);
        self.element.set_muted(volume == 0.0);
    }

    pub fn toggle_mute(&mut self) {
        if self.state.is_muted {
            // Unmuting at zero volume would leave the state muted-but-not
            if self.state.volume == 0.0 {
                self.element.set_volume(1.0);
            }
            self.element.set_muted(false);
        } else {
            self.element.set_muted(true);
        }
    }

    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        if !PLAYBACK_RATES.contains(&rate) {
            return Err(AdSlotError::UnsupportedRate(rate));
        }
        self.element.set_playback_rate(rate);
        Ok(())
    }

    /// Enter or leave fullscreen. Refusals are logged and ignored.
    pub fn toggle_fullscreen(&mut self) {
        if !self.settings.allow_fullscreen {
            debug!("Fullscreen disabled for this slot");
            return;
        }

        let result = if self.state.is_fullscreen {
            self.element.exit_fullscreen()
        } else {
            self.element.request_fullscreen()
        };

        if let Err(e) = result {
            warn!("Fullscreen request failed: {}", e);
        }
    }

    /// Enter or leave picture-in-picture. Best effort.
    pub fn toggle_pip(&mut self) {
        if !self.settings.allow_pip {
            debug!("Picture-in-picture disabled for this slot");
            return;
        }

        let result = if self.state.is_pip {
            self.element.exit_picture_in_picture()
        } else {
            self.element.request_picture_in_picture()
        };

        if let Err(e) = result {
            warn!("Picture-in-picture request failed: {}", e);
        }
    }

    pub fn set_controls_visible(&mut self, visible: bool) {
        self.state.controls_visible = visible;
    }

    /// Stop playback and detach every listener. Idempotent.
    pub fn close(&mut self) {
        if !self.listening {
            return;
        }

        if self.state.is_fullscreen {
            if let Err(e) = self.element.exit_fullscreen() {
                debug!("Exit fullscreen on close failed: {}", e);
            }
        }
        if self.state.is_pip {
            if let Err(e) = self.element.exit_picture_in_picture() {
                debug!("Exit picture-in-picture on close failed: {}", e);
            }
        }
        if self.state.is_playing {
            if let Err(e) = self.element.pause() {
                debug!("Pause on close failed: {}", e);
            }
        }

        self.element.detach_listeners();
        self.listening = false;
        debug!("Video controller closed");
    }
}

impl Drop for VideoController {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for VideoController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoController")
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("listening", &self.listening)
            .finish()
    }
}
