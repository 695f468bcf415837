pub mod controller;
pub mod overlay;
pub mod state;

pub use controller::{MediaElement, PlayerSettings, PlayerSignal, VideoController};
pub use overlay::AutoHideOverlay;
pub use state::{MediaEvent, PLAYBACK_RATES, PlaybackState, PlayerPhase};
