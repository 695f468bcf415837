use serde::Serialize;
use tracing::debug;

/// Visibility observer settings the host applies to its platform observer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObserverConfig {
    /// Minimum visible fraction, 0.0 to 1.0
    pub threshold: f64,
    /// CSS-style root margin, e.g. `"0px"` or `"50px 0px"`
    pub root_margin: String,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            root_margin: "0px".to_string(),
        }
    }
}

/// One visibility observation delivered by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

impl IntersectionEntry {
    pub fn visible(ratio: f64) -> Self {
        Self {
            is_intersecting: ratio > 0.0,
            intersection_ratio: ratio,
        }
    }

    pub fn hidden() -> Self {
        Self {
            is_intersecting: false,
            intersection_ratio: 0.0,
        }
    }
}

/// Exactly-once impression guard for one ad instance
///
/// `observe` returns `true` at most once between resets, and only for an
/// entry that meets the threshold while the observer is connected.
#[derive(Debug)]
pub struct ImpressionTracker {
    config: ObserverConfig,
    fired: bool,
    connected: bool,
}

impl ImpressionTracker {
    pub fn new(mut config: ObserverConfig) -> Self {
        config.threshold = if config.threshold.is_finite() {
            config.threshold.clamp(0.0, 1.0)
        } else {
            ObserverConfig::default().threshold
        };
        Self {
            config,
            fired: false,
            connected: false,
        }
    }

    pub fn config(&self) -> &ObserverConfig {
        &self.config
    }

    /// Start observing, unless the impression already fired
    pub fn arm(&mut self) {
        if !self.fired {
            self.connected = true;
        }
    }

    /// Forget the previous ad: clears the flag and disconnects
    pub fn reset(&mut self) {
        self.fired = false;
        self.connected = false;
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Feed one observation; returns `true` if the impression fires now
    pub fn observe(&mut self, entry: IntersectionEntry) -> bool {
        if !self.connected || self.fired {
            return false;
        }

        let meets_threshold =
            entry.is_intersecting && entry.intersection_ratio >= self.config.threshold;
        if !meets_threshold {
            debug!(
                "Visibility {:.2} below threshold {:.2}",
                entry.intersection_ratio, self.config.threshold
            );
            return false;
        }

        self.fired = true;
        self.connected = false;
        true
    }
}
