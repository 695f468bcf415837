use crate::error::AdSlotError;
use serde::{Deserialize, Serialize};

/// Creative type as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdType {
    Image,
    Video,
    Html,
}

/// Ad record exactly as the backend serialises it
///
/// Media fields are flat and optional; which of them must be present depends
/// on `ad_type`. Conversion into [`AdCandidate`] enforces that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdRecord {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    pub slug: String,
    pub ad_type: AdType,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_alt: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub video_thumbnail_url: Option<String>,
    #[serde(default)]
    pub html_content: Option<String>,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub open_in_new_tab: bool,
    #[serde(default)]
    pub cta_text: Option<String>,
    #[serde(default)]
    pub placement: String,
}

/// Type-specific media of an ad
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Creative {
    Image {
        url: String,
        alt: String,
    },
    Video {
        url: String,
        thumbnail_url: Option<String>,
    },
    Html {
        payload: String,
    },
}

/// A renderable ad. Never patched in place; a new fetch replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdCandidate {
    pub id: u64,
    pub title: String,
    pub slug: String,
    pub creative: Creative,
    pub link_url: Option<String>,
    pub open_in_new_tab: bool,
    pub cta_text: Option<String>,
    pub placement: String,
}

impl AdCandidate {
    pub fn ad_type(&self) -> AdType {
        match self.creative {
            Creative::Image { .. } => AdType::Image,
            Creative::Video { .. } => AdType::Video,
            Creative::Html { .. } => AdType::Html,
        }
    }
}

/// Treat blank strings from the backend the same as missing fields
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl TryFrom<AdRecord> for AdCandidate {
    type Error = AdSlotError;

    fn try_from(record: AdRecord) -> Result<Self, Self::Error> {
        if record.slug.trim().is_empty() {
            return Err(AdSlotError::InvalidAd(format!(
                "ad {} has an empty slug",
                record.id
            )));
        }

        let creative = match record.ad_type {
            AdType::Image => {
                let url = non_empty(record.image_url).ok_or_else(|| {
                    AdSlotError::InvalidAd(format!("image ad '{}' has no image_url", record.slug))
                })?;
                Creative::Image {
                    url,
                    alt: non_empty(record.image_alt).unwrap_or_else(|| record.title.clone()),
                }
            }
            AdType::Video => {
                let url = non_empty(record.video_url).ok_or_else(|| {
                    AdSlotError::InvalidAd(format!("video ad '{}' has no video_url", record.slug))
                })?;
                Creative::Video {
                    url,
                    thumbnail_url: non_empty(record.video_thumbnail_url),
                }
            }
            AdType::Html => {
                let payload = non_empty(record.html_content).ok_or_else(|| {
                    AdSlotError::InvalidAd(format!("html ad '{}' has no html_content", record.slug))
                })?;
                Creative::Html { payload }
            }
        };

        Ok(AdCandidate {
            id: record.id,
            title: record.title,
            slug: record.slug,
            creative,
            link_url: non_empty(record.link_url),
            open_in_new_tab: record.open_in_new_tab,
            cta_text: non_empty(record.cta_text),
            placement: record.placement,
        })
    }
}
