use serde::Serialize;

/// Playback speeds offered by the speed menu
pub const PLAYBACK_RATES: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// Where a video ad is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerPhase {
    Thumbnail,
    Loading,
    Buffering,
    Playing,
    Paused,
    Ended,
}

/// Displayed playback state. Only element notifications change it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub current_time: f64,
    pub duration: f64,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub volume: f64,
    pub is_muted: bool,
    pub playback_rate: f64,
    pub is_fullscreen: bool,
    pub is_pip: bool,
    pub controls_visible: bool,
}

impl PlaybackState {
    pub fn new(muted: bool) -> Self {
        Self {
            current_time: 0.0,
            duration: 0.0,
            is_playing: false,
            is_buffering: false,
            volume: 1.0,
            is_muted: muted,
            playback_rate: 1.0,
            is_fullscreen: false,
            is_pip: false,
            controls_visible: true,
        }
    }

    /// Fraction of the video played, 0.0 when the duration is unknown
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Clamp a time target into `[0, duration]`
    pub fn clamp_time(&self, seconds: f64) -> f64 {
        if !seconds.is_finite() {
            return self.current_time;
        }
        seconds.clamp(0.0, self.duration.max(0.0))
    }
}

/// Notifications from the underlying media element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Play,
    Playing,
    Pause,
    Waiting,
    CanPlay,
    TimeUpdate(f64),
    DurationChange(f64),
    VolumeChange { volume: f64, muted: bool },
    RateChange(f64),
    Ended,
    FullscreenChange(bool),
    PipChange(bool),
    Error(String),
}
