//! adslot: headless client-side ad slot widget
//!
//! Fetches an ad for a placement with bounded retries, loads its media into
//! revocable local handles, tracks impressions exactly once and clicks
//! without blocking navigation, and drives video playback through a
//! platform media element. The binary in main.rs hosts a slot against the
//! demo backend.

pub mod ad;
pub mod config;
pub mod demo;
pub mod error;
pub mod media;
pub mod metrics;
pub mod player;
pub mod render;
pub mod slot;
pub mod tracking;

#[cfg(test)]
mod test_support;

pub use ad::{AdApi, AdCandidate, AdRequest, HttpAdApi};
pub use error::{AdSlotError, Result};
pub use slot::{AdSlot, Callbacks, SlotStatus, WidgetOptions};
