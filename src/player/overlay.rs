use std::time::Duration;

/// Auto-hide logic for transport controls
///
/// Pure bookkeeping: the owner schedules a timer for the epoch returned by
/// [`AutoHideOverlay::activity`] and reports back through
/// [`AutoHideOverlay::should_hide`]. Any newer activity makes older timers
/// stale. A zero delay disables auto-hiding.
#[derive(Debug, Clone)]
pub struct AutoHideOverlay {
    delay: Duration,
    epoch: u64,
    armed: bool,
}

impl AutoHideOverlay {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            epoch: 0,
            armed: false,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Register pointer/touch activity or a playback (re)start
    ///
    /// Returns the epoch to schedule a hide timer for, or `None` when the
    /// controls must stay up (paused, or auto-hide disabled).
    pub fn activity(&mut self, playing: bool) -> Option<u64> {
        self.epoch += 1;
        self.armed = playing && !self.delay.is_zero();
        self.armed.then_some(self.epoch)
    }

    /// Invalidate any pending timer
    pub fn cancel(&mut self) {
        self.epoch += 1;
        self.armed = false;
    }

    /// Whether a timer that fired for `epoch` should hide the controls now
    pub fn should_hide(&mut self, epoch: u64, playing: bool) -> bool {
        let hide = self.armed && epoch == self.epoch && playing;
        if hide {
            self.armed = false;
        }
        hide
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hides_after_idle_while_playing() {
        let mut overlay = AutoHideOverlay::new(Duration::from_secs(3));
        let epoch = overlay.activity(true).unwrap();
        assert!(overlay.should_hide(epoch, true));
        // A timer only hides once
        assert!(!overlay.should_hide(epoch, true));
    }

    #[test]
    fn test_activity_makes_old_timer_stale() {
        let mut overlay = AutoHideOverlay::new(Duration::from_secs(3));
        let first = overlay.activity(true).unwrap();
        let second = overlay.activity(true).unwrap();
        assert!(!overlay.should_hide(first, true));
        assert!(overlay.should_hide(second, true));
    }

    #[test]
    fn test_never_hides_while_paused() {
        let mut overlay = AutoHideOverlay::new(Duration::from_secs(3));
        assert_eq!(overlay.activity(false), None);

        let epoch = overlay.activity(true).unwrap();
        // Paused before the timer fired
        assert!(!overlay.should_hide(epoch, false));
    }

    #[test]
    fn test_cancel_invalidates_timer() {
        let mut overlay = AutoHideOverlay::new(Duration::from_secs(3));
        let epoch = overlay.activity(true).unwrap();
        overlay.cancel();
        assert!(!overlay.should_hide(epoch, true));
    }

    #[test]
    fn test_zero_delay_disables() {
        let mut overlay = AutoHideOverlay::new(Duration::ZERO);
        assert_eq!(overlay.activity(true), None);
    }
}
