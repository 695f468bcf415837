use crate::ad::api::{AdApi, AdRequest};
use crate::ad::model::AdCandidate;
use crate::error::AdSlotError;
use crate::metrics;
use std::time::Duration;
use tracing::{error, info, warn};

/// Bounded exponential backoff for ad fetches
///
/// The delay after failed attempt `n` (1-based) is `base_delay * 2^(n-1)`,
/// capped at `max_delay`. Delays never decrease from one attempt to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per fetch cycle, including the first. 0 behaves as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Per-slot retry bookkeeping. Reset on success or on a context change.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts used by the last cycle that failed
    pub attempts: u32,
    /// Set once a cycle ran out of attempts; blocks new cycles
    pub exhausted: bool,
}

/// Result of one fetch cycle
#[derive(Debug)]
pub enum FetchOutcome {
    Found(AdCandidate),
    /// The backend has no ad for this slot. Not an error.
    NoAd,
    /// Every attempt failed
    Exhausted {
        attempts: u32,
        last_error: AdSlotError,
    },
}

/// Resolve an ad for `request`, retrying retryable failures with backoff
///
/// Records that fail conversion into an [`AdCandidate`] count as failed
/// attempts. An empty result ends the cycle immediately.
pub async fn fetch_with_retry<A: AdApi>(
    api: &A,
    request: &AdRequest,
    policy: &RetryPolicy,
) -> FetchOutcome {
    let max_attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = api
            .fetch_ad(request)
            .await
            .and_then(|record| record.map(AdCandidate::try_from).transpose());

        match result {
            Ok(Some(ad)) => {
                info!(
                    placement = %request.placement,
                    slug = %ad.slug,
                    attempt,
                    "Ad resolved"
                );
                metrics::record_ad_fetch("found");
                return FetchOutcome::Found(ad);
            }
            Ok(None) => {
                info!(placement = %request.placement, "No ad available for placement");
                metrics::record_ad_fetch("empty");
                return FetchOutcome::NoAd;
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    placement = %request.placement,
                    "Ad fetch failed: {} (attempt {}/{}), retrying in {:?}",
                    e, attempt, max_attempts, delay
                );
                metrics::record_fetch_retry();
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!(
                    placement = %request.placement,
                    "Ad fetch failed: {} (attempt {}/{}), giving up",
                    e, attempt, max_attempts
                );
                metrics::record_ad_fetch("error");
                return FetchOutcome::Exhausted {
                    attempts: attempt,
                    last_error: e,
                };
            }
        }
    }
}
