use crate::ad::model::AdRecord;
use crate::error::{AdSlotError, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// What a slot asks the backend for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdRequest {
    /// Named layout slot, e.g. `sidebar_top`
    pub placement: String,
    /// Page/content the ad is shown within
    pub content_id: Option<String>,
}

impl AdRequest {
    pub fn new(placement: impl Into<String>, content_id: Option<String>) -> Self {
        Self {
            placement: placement.into(),
            content_id,
        }
    }
}

/// Trait for the backend the slot talks to
///
/// The backend's ad selection is opaque; the slot only relies on this
/// request/response contract. `HttpAdApi` is the production implementation.
pub trait AdApi: Send + Sync + 'static {
    /// Fetch zero or one ad for the placement. `Ok(None)` means no ad.
    fn fetch_ad(&self, request: &AdRequest)
    -> impl Future<Output = Result<Option<AdRecord>>> + Send;

    /// Record that an ad became visible
    fn record_impression(
        &self,
        slug: &str,
        content_id: Option<&str>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Record a click on an ad's primary link
    fn record_click(
        &self,
        slug: &str,
        content_id: Option<&str>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Fetch raw media bytes
    fn fetch_media(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

#[derive(Serialize)]
struct TrackingBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content_id: Option<&'a str>,
}

/// reqwest-backed [`AdApi`]
#[derive(Clone, Debug)]
pub struct HttpAdApi {
    base_url: Url,
    client: Client,
    timeout: Duration,
}

impl HttpAdApi {
    /// Create a client for the API rooted at `base_url`
    ///
    /// # Arguments
    /// * `base_url` - Absolute http(s) URL of the backend, e.g. `https://example.com`
    /// * `client` - Shared HTTP client
    pub fn new(base_url: &str, client: Client) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AdSlotError::ConfigError(format!("invalid API base URL {base_url}: {e}")))?;

        match base_url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(AdSlotError::ConfigError(format!(
                    "API base URL scheme '{scheme}' not supported"
                )));
            }
        }

        Ok(Self {
            base_url,
            client,
            timeout: Duration::from_secs(10),
        })
    }

    /// Override the per-request timeout (10 s by default)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build `{base}/api/ads/<segments...>` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AdSlotError::ConfigError("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["api", "ads"])
            .extend(segments);
        Ok(url)
    }

    async fn post_tracking(&self, slug: &str, event: &str, content_id: Option<&str>) -> Result<()> {
        let url = self.endpoint(&[slug, event])?;
        let resp = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&TrackingBody { content_id })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AdSlotError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}

impl AdApi for HttpAdApi {
    async fn fetch_ad(&self, request: &AdRequest) -> Result<Option<AdRecord>> {
        let mut url = self.endpoint(&["placement", &request.placement])?;
        if let Some(content_id) = &request.content_id {
            url.query_pairs_mut().append_pair("content_id", content_id);
        }

        debug!("Fetching ad from {}", url);
        let resp = self.client.get(url).timeout(self.timeout).send().await?;

        match resp.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => return Ok(None),
            status if !status.is_success() => return Err(AdSlotError::Status(status.as_u16())),
            _ => {}
        }

        let body = resp.text().await?;
        parse_ad_body(&body)
    }

    async fn record_impression(&self, slug: &str, content_id: Option<&str>) -> Result<()> {
        self.post_tracking(slug, "impression", content_id).await
    }

    async fn record_click(&self, slug: &str, content_id: Option<&str>) -> Result<()> {
        self.post_tracking(slug, "click", content_id).await
    }

    async fn fetch_media(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).timeout(self.timeout).send().await?;
        if !resp.status().is_success() {
            return Err(AdSlotError::Media(format!(
                "{} returned status {}",
                url,
                resp.status()
            )));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

/// Decode an ads-by-placement response body
///
/// `null`, `{}` and `[]` mean "no ad for this slot". A non-empty array yields
/// its first record. Anything that is not JSON, or does not match the record
/// shape, is a decode error.
pub fn parse_ad_body(body: &str) -> Result<Option<AdRecord>> {
    let value: serde_json::Value = serde_json::from_str(body.trim())
        .map_err(|e| AdSlotError::Decode(format!("response is not JSON: {e}")))?;

    let record = match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Object(ref map) if map.is_empty() => return Ok(None),
        serde_json::Value::Array(mut items) => {
            if items.is_empty() {
                return Ok(None);
            }
            items.swap_remove(0)
        }
        other => other,
    };

    serde_json::from_value(record)
        .map(Some)
        .map_err(|e| AdSlotError::Decode(format!("unexpected ad record shape: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bodies_mean_no_ad() {
        assert_eq!(parse_ad_body("null").unwrap(), None);
        assert_eq!(parse_ad_body("{}").unwrap(), None);
        assert_eq!(parse_ad_body(" [] ").unwrap(), None);
    }

    #[test]
    fn test_non_json_is_decode_error() {
        let err = parse_ad_body("<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, AdSlotError::Decode(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_array_takes_first_record() {
        let body = r#"[
            {"id": 1, "slug": "first", "ad_type": "html", "html_content": "<p>a</p>"},
            {"id": 2, "slug": "second", "ad_type": "html", "html_content": "<p>b</p>"}
        ]"#;
        let record = parse_ad_body(body).unwrap().unwrap();
        assert_eq!(record.slug, "first");
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let api = HttpAdApi::new("http://localhost:3000/", Client::new()).unwrap();
        let url = api.endpoint(&["placement", "sidebar top"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/ads/placement/sidebar%20top"
        );

        let nested = HttpAdApi::new("https://example.com/v1", Client::new()).unwrap();
        let url = nested.endpoint(&["spring-sale", "click"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/v1/api/ads/spring-sale/click");
    }

    #[test]
    fn test_timeout_defaults_and_overrides() {
        let api = HttpAdApi::new("http://localhost:3000", Client::new()).unwrap();
        assert_eq!(api.timeout, Duration::from_secs(10));
        let api = api.with_timeout(Duration::from_secs(2));
        assert_eq!(api.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_rejects_non_http_base() {
        assert!(HttpAdApi::new("ftp://example.com", Client::new()).is_err());
        assert!(HttpAdApi::new("not a url", Client::new()).is_err());
    }
}
