use metrics::{counter, gauge};

// ── Metric names ────────────────────────────────────────────────────────

/// Ad fetch cycles by result (found, empty, error)
pub const AD_FETCHES: &str = "adslot_ad_fetches_total";
/// Retries scheduled after a failed ad fetch attempt
pub const FETCH_RETRIES: &str = "adslot_fetch_retries_total";
/// Media loads by kind and result
pub const MEDIA_LOADS: &str = "adslot_media_loads_total";
/// Impression/click calls by event and result
pub const TRACKING_CALLS: &str = "adslot_tracking_calls_total";
/// Blob handles created
pub const BLOBS_CREATED: &str = "adslot_blobs_created_total";
/// Blob handles revoked
pub const BLOBS_REVOKED: &str = "adslot_blobs_revoked_total";
/// Currently mounted slots
pub const MOUNTED_SLOTS: &str = "adslot_mounted_slots";

// ── Recording helpers ───────────────────────────────────────────────────

/// Record the result of a complete fetch cycle
pub fn record_ad_fetch(result: &str) {
    counter!(AD_FETCHES, "result" => result.to_string()).increment(1);
}

/// Record a scheduled retry
pub fn record_fetch_retry() {
    counter!(FETCH_RETRIES).increment(1);
}

/// Record a media load result
pub fn record_media_load(kind: &str, result: &str) {
    counter!(MEDIA_LOADS, "kind" => kind.to_string(), "result" => result.to_string())
        .increment(1);
}

/// Record a tracking call result
pub fn record_tracking_call(event: &str, result: &str) {
    counter!(TRACKING_CALLS, "event" => event.to_string(), "result" => result.to_string())
        .increment(1);
}

pub fn record_blob_created() {
    counter!(BLOBS_CREATED).increment(1);
}

pub fn record_blob_revoked() {
    counter!(BLOBS_REVOKED).increment(1);
}

/// Adjust the mounted slot gauge
pub fn slot_mounted() {
    gauge!(MOUNTED_SLOTS).increment(1.0);
}

pub fn slot_unmounted() {
    gauge!(MOUNTED_SLOTS).decrement(1.0);
}
