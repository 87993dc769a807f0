use serde::{Deserialize, Serialize};

/// Overlay placement hint persisted server-side, in editor canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub x: f64,
    pub y: f64,
}

/// Kind of media a template carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Image,
    Video,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Image => write!(f, "image"),
            ResourceType::Video => write!(f, "video"),
        }
    }
}

/// Media payload for a template record.
///
/// The server sends several optional URL fields (`image_url`, `video_url`,
/// `secure_url`, `url`); they are collapsed into this sum type at the
/// gateway boundary so nothing downstream branches on field presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateMedia {
    Image { url: String },
    Video { url: String, poster: Option<String> },
}

impl TemplateMedia {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            TemplateMedia::Image { .. } => ResourceType::Image,
            TemplateMedia::Video { .. } => ResourceType::Video,
        }
    }

    /// The URL to display: image URL for images, video URL for videos.
    pub fn url(&self) -> &str {
        match self {
            TemplateMedia::Image { url } => url,
            TemplateMedia::Video { url, .. } => url,
        }
    }

    /// Poster frame for videos; images have none.
    pub fn poster(&self) -> Option<&str> {
        match self {
            TemplateMedia::Image { .. } => None,
            TemplateMedia::Video { poster, .. } => poster.as_deref(),
        }
    }
}

/// A normalized template record. Immutable once fetched.
///
/// `serial_no` is the primary addressing key: unique per (category,
/// religion-scope), starting at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: String,
    pub serial_no: u32,
    pub category: String,
    pub subcategory: String,
    /// Main category; `"all"` means unfiltered.
    pub religion: String,
    pub media: TemplateMedia,
    pub photo_container_axis: Option<Axis>,
    pub text_container_axis: Option<Axis>,
    pub ratio: String,
}

// ============================================================================
// Wire types
// ============================================================================

/// Default aspect ratio when the server omits one (portrait editor canvas).
const DEFAULT_RATIO: &str = "9:16";

/// Template document as the server sends it, before normalization.
/// Every field is optional because the two API generations disagree on
/// which ones are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawTemplate {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub serial_no: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default, alias = "main_category")]
    pub religion: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub secure_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub photo_container_axis: Option<Axis>,
    #[serde(default)]
    pub text_container_axis: Option<Axis>,
    #[serde(default)]
    pub ratio: Option<String>,
}

impl RawTemplate {
    /// Normalize a wire document into a `TemplateRecord`.
    ///
    /// Returns `None` when the document is unusable: missing or zero
    /// serial number, or no resolvable media URL. A `video_url` or an
    /// explicit `resource_type` of "video" marks the record as video;
    /// its `image_url` then serves as the poster frame.
    pub(crate) fn normalize(self) -> Option<TemplateRecord> {
        let RawTemplate {
            id,
            serial_no,
            category,
            subcategory,
            religion,
            resource_type,
            image_url,
            video_url,
            secure_url,
            url,
            photo_container_axis,
            text_container_axis,
            ratio,
        } = self;

        let serial_no = serial_no.filter(|s| *s >= 1)?;

        let is_video = resource_type.as_deref() == Some("video") || video_url.is_some();
        let media = if is_video {
            let poster = image_url.clone();
            let media_url = video_url.or(image_url)?;
            TemplateMedia::Video { url: media_url, poster }
        } else {
            let media_url = image_url.or(secure_url).or(url)?;
            TemplateMedia::Image { url: media_url }
        };

        // Older documents only carry `category`; newer ones split into
        // religion + subcategory. Mirror one into the other when absent.
        let subcategory = subcategory
            .or_else(|| category.clone())
            .unwrap_or_default()
            .to_lowercase();
        let category = category.unwrap_or_else(|| subcategory.clone()).to_lowercase();

        Some(TemplateRecord {
            id: id.unwrap_or_default(),
            serial_no,
            category,
            subcategory,
            religion: religion
                .map(|r| r.trim().to_lowercase())
                .unwrap_or_else(|| "all".to_string()),
            media,
            photo_container_axis,
            text_container_axis,
            ratio: ratio.unwrap_or_else(|| DEFAULT_RATIO.to_string()),
        })
    }
}

/// `{ success, data: { templates: [...], pagination: {...} } }`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: ListData,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListData {
    #[serde(default)]
    pub templates: Vec<RawTemplate>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Pagination {
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub pages: u32,
}

/// `{ success, data: { template: {...} } }` from the latest-template
/// endpoints.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LatestEnvelope {
    #[serde(default)]
    pub data: LatestData,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LatestData {
    #[serde(default)]
    pub template: Option<RawTemplate>,
}

/// `{ success, data: {...} }`; the legacy by-serial endpoint returns the
/// document directly under `data`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SingleEnvelope {
    #[serde(default)]
    pub data: Option<RawTemplate>,
}
