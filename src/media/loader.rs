use crate::ad::AdApi;
use crate::error::{AdSlotError, Result};
use crate::media::blob::MediaBlob;
use crate::metrics;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

/// Which asset of an ad a load belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Thumbnail,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Thumbnail => "thumbnail",
            MediaKind::Video => "video",
        }
    }
}

/// Load state of one asset
#[derive(Debug, Default)]
pub enum MediaSlot {
    #[default]
    Idle,
    Loading,
    Ready(MediaBlob),
    /// The renderer falls back to a placeholder
    Failed,
}

impl MediaSlot {
    pub fn blob_url(&self) -> Option<&str> {
        match self {
            MediaSlot::Ready(blob) => Some(blob.url()),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MediaSlot::Failed)
    }
}

/// Check that a media URL is absolute http(s) with a host
pub fn validate_media_url(url: &str) -> Result<Url> {
    let parsed =
        Url::parse(url).map_err(|_| AdSlotError::InvalidMediaUrl(format!("Invalid URL: {url}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AdSlotError::InvalidMediaUrl(format!(
                "Scheme '{scheme}' not allowed, only http/https permitted"
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(AdSlotError::InvalidMediaUrl(format!("No host in URL: {url}")));
    }

    Ok(parsed)
}

/// Retrieve the bytes behind a remote media URL
///
/// The caller turns the bytes into a [`MediaBlob`] only if the load is
/// still wanted when it completes.
pub async fn load_media<A: AdApi>(api: &A, kind: MediaKind, url: &str) -> Result<Vec<u8>> {
    let url = validate_media_url(url)?;

    let result = api.fetch_media(url.as_str()).await.and_then(|bytes| {
        if bytes.is_empty() {
            Err(AdSlotError::Media(format!("{url} returned an empty body")))
        } else {
            Ok(bytes)
        }
    });

    match &result {
        Ok(bytes) => {
            debug!("Loaded {} media from {} ({} bytes)", kind.as_str(), url, bytes.len());
            metrics::record_media_load(kind.as_str(), "success");
        }
        Err(e) => {
            warn!("Failed to load {} media: {}", kind.as_str(), e);
            metrics::record_media_load(kind.as_str(), "error");
        }
    }

    result
}
