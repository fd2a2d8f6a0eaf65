/// HTTP handlers for the video catalog API
///
/// This module contains handlers for:
/// - Videos: submission, detail and status reads, field updates, view
///   and rating recording, related lists, and the catalog listings
/// - Search: ranked video search and tag suggestions
///
/// Handlers stay thin: request validation plus one service call. All
/// business rules live in `crate::services`.
pub mod search;
pub mod videos;

// Re-export handler functions at module level
pub use search::{search_videos, suggest_tags};
pub use videos::{
    get_latest_videos, get_rating_summary, get_related_videos, get_trending_videos,
    get_video_details, get_video_status, get_videos_by_tag, get_videos_by_uploader,
    preview_video, rate_video, record_view, submit_video, update_video,
};
