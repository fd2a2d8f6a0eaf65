/// Data models for the video catalog service
///
/// This module defines structures for:
/// - VideoRecord: the central catalog entity with lifecycle status
/// - RatingEntry: per-user per-video rating rows
/// - ViewEvent: append-only view activity feeding trending
/// - Response summaries and the pagination envelope
///
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ========================================
// Video Models
// ========================================

/// Video status in the ingestion lifecycle
///
/// Transitions move forward only, except that ERROR may re-enter
/// PROCESSING when the follow-up pass is re-invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VideoStatus {
    Pending,
    Processing,
    Ready,
    Error,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Ready => "READY",
            Self::Error => "ERROR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "READY" => Some(Self::Ready),
            "ERROR" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Documents written before the lifecycle field existed carry no status;
/// every reader treats absence as READY.
impl Default for VideoStatus {
    fn default() -> Self {
        Self::Ready
    }
}

/// Video catalog entity, stored as a JSON document in the `videos` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub video_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Submitted source URL, verbatim
    pub source_location: String,
    /// Short platform key extracted from the source URL
    pub source_platform_id: String,
    #[serde(default)]
    pub preview_image_url: Option<String>,
    #[serde(default)]
    pub status: VideoStatus,
    pub submitted_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    /// Fixed-dimension semantic vector; null until first computed
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub rating_total: u64,
    #[serde(default)]
    pub rating_count: u64,
}

impl VideoRecord {
    /// Text embedded for discovery: name, description, and tags joined
    /// with single spaces, empty parts skipped.
    pub fn composite_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(2 + self.tags.len());
        parts.push(self.name.as_str());
        if let Some(description) = &self.description {
            if !description.trim().is_empty() {
                parts.push(description.as_str());
            }
        }
        for tag in &self.tags {
            parts.push(tag.as_str());
        }
        parts.join(" ")
    }

    pub fn average_rating(&self) -> Option<f64> {
        if self.rating_count > 0 {
            Some(self.rating_total as f64 / self.rating_count as f64)
        } else {
            None
        }
    }
}

// ========================================
// Engagement Models
// ========================================

/// One rating row, keyed by (videoId, userId); upserts replace `value`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingEntry {
    pub video_id: Uuid,
    pub user_id: Uuid,
    /// 1..=5
    pub value: u32,
    pub rated_at: DateTime<Utc>,
}

/// Append-only view event in the `video_activity` collection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewEvent {
    pub video_id: Uuid,
    pub viewed_at: DateTime<Utc>,
}

/// Aggregate rating state for one video
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub video_id: Uuid,
    pub rating_total: u64,
    pub rating_count: u64,
    pub average: Option<f64>,
}

// ========================================
// Response DTOs
// ========================================

/// Compact video representation for listings and search results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub video_id: Uuid,
    pub name: String,
    pub preview_image_url: Option<String>,
    pub owner_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub view_count: u64,
    pub average_rating: Option<f64>,
}

impl From<&VideoRecord> for VideoSummary {
    fn from(record: &VideoRecord) -> Self {
        VideoSummary {
            video_id: record.video_id,
            name: record.name.clone(),
            preview_image_url: record.preview_image_url.clone(),
            owner_id: record.owner_id,
            submitted_at: record.submitted_at,
            view_count: record.view_count,
            average_rating: record.average_rating(),
        }
    }
}

/// Full video representation for detail and submission responses. The
/// embedding never leaves the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    pub video_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub source_location: String,
    pub source_platform_id: String,
    pub preview_image_url: Option<String>,
    pub status: VideoStatus,
    pub submitted_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub view_count: u64,
    pub average_rating: Option<f64>,
    pub rating_count: u64,
}

impl From<&VideoRecord> for VideoDetail {
    fn from(record: &VideoRecord) -> Self {
        VideoDetail {
            video_id: record.video_id,
            owner_id: record.owner_id,
            name: record.name.clone(),
            description: record.description.clone(),
            tags: record.tags.clone(),
            source_location: record.source_location.clone(),
            source_platform_id: record.source_platform_id.clone(),
            preview_image_url: record.preview_image_url.clone(),
            status: record.status,
            submitted_at: record.submitted_at,
            last_updated_at: record.last_updated_at,
            view_count: record.view_count,
            average_rating: record.average_rating(),
            rating_count: record.rating_count,
        }
    }
}

/// Related-video entry carrying the store-reported similarity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedVideo {
    pub video_id: Uuid,
    pub name: String,
    pub preview_image_url: Option<String>,
    pub score: f32,
}

/// One tag autocomplete candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSuggestion {
    pub tag: String,
}

/// Trending entry carrying the view count inside the ranking window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingVideo {
    pub video_id: Uuid,
    pub name: String,
    pub preview_image_url: Option<String>,
    pub recent_views: u64,
}

// ========================================
// Pagination
// ========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl Pagination {
    pub fn new(current_page: usize, page_size: usize, total_items: usize) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            (total_items + page_size - 1) / page_size
        };
        Pagination {
            current_page,
            page_size,
            total_items,
            total_pages,
        }
    }
}

/// Standard list envelope: `{data: [...], pagination: {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, current_page: usize, page_size: usize, total_items: usize) -> Self {
        PaginatedResponse {
            data,
            pagination: Pagination::new(current_page, page_size, total_items),
        }
    }
}
