use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Domain-specific error types for the ad slot
///
/// None of these ever reach the host page: the slot logs them, counts them
/// and hands them to the `on_error` callback.
#[derive(Error, Debug)]
pub enum AdSlotError {
    #[error("Failed to reach ad API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Ad API returned status {0}")]
    Status(u16),

    #[error("Failed to decode ad response: {0}")]
    Decode(String),

    #[error("Ad record cannot be rendered: {0}")]
    InvalidAd(String),

    #[error("Media URL rejected: {0}")]
    InvalidMediaUrl(String),

    #[error("Failed to load media: {0}")]
    Media(String),

    #[error("Platform refused request: {0}")]
    Platform(String),

    #[error("Unsupported playback rate: {0}")]
    UnsupportedRate(f64),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AdSlotError {
    /// Whether an ad fetch that failed with this error may be attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdSlotError::Transport(_)
                | AdSlotError::Status(_)
                | AdSlotError::Decode(_)
                | AdSlotError::InvalidAd(_)
        )
    }
}

// Used by the demo backend handlers
impl IntoResponse for AdSlotError {
    fn into_response(self) -> Response {
        let status = match self {
            AdSlotError::Media(ref e) => {
                tracing::warn!("Media not found: {}", e);
                StatusCode::NOT_FOUND
            }
            AdSlotError::Status(code) => {
                StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ref e => {
                tracing::error!("Demo backend error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}

// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, AdSlotError>;
