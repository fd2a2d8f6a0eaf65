/// Video handlers - HTTP endpoints for submission, lifecycle and engagement
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::models::{PaginatedResponse, VideoDetail, VideoStatus};
use crate::services::{CatalogService, EngagementService, IngestionService, VideoFieldUpdate};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVideoRequest {
    #[validate(length(min = 1))]
    pub source_url: String,
    /// Optional caller-chosen title, usually pre-filled from the preview step
    #[validate(length(min = 1, max = 150))]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVideoRequest {
    #[validate(length(min = 3, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RateVideoRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatusResponse {
    pub video_id: Uuid,
    pub status: VideoStatus,
}

#[derive(Debug, Serialize)]
pub struct PreviewTitleResponse {
    pub title: String,
}

/// Pagination query parameters; the page size default and ceiling come
/// from the search configuration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: usize,
    pub page_size: Option<usize>,
}

fn default_page() -> usize {
    1
}

fn resolve_page(query: &PageQuery, config: &Config) -> (usize, usize) {
    let page = query.page.max(1);
    let page_size = query
        .page_size
        .unwrap_or(config.search.default_page_size)
        .clamp(1, config.search.max_page_size);
    (page, page_size)
}

#[derive(Debug, Deserialize)]
pub struct RelatedQuery {
    #[serde(default = "default_related_limit")]
    pub limit: usize,
}

fn default_related_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingQuery {
    #[serde(default = "default_interval_days")]
    pub interval_days: u32,
    #[serde(default = "default_trending_limit")]
    pub limit: usize,
}

fn default_interval_days() -> u32 {
    1
}

fn default_trending_limit() -> usize {
    10
}

/// POST /api/v1/videos
///
/// Submit a source URL for ingestion; responds 202 with the record as
/// persisted so far while the follow-up pass runs detached.
pub async fn submit_video(
    ingestion: web::Data<IngestionService>,
    user: UserId,
    req: web::Json<SubmitVideoRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let payload = req.into_inner();

    let record = ingestion
        .submit(&payload.source_url, payload.title, user.0)
        .await?;

    if ingestion.background_processing_enabled() {
        let service = ingestion.clone().into_inner();
        let video_id = record.video_id;
        let platform_id = record.source_platform_id.clone();
        tokio::spawn(async move {
            service.process_submission(video_id, &platform_id).await;
        });
    }

    Ok(HttpResponse::Accepted().json(VideoDetail::from(&record)))
}

/// GET /api/v1/videos/{id}
///
/// Full video metadata; viewing it does not count as playback.
pub async fn get_video_details(
    catalog: web::Data<CatalogService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let video_id = path.into_inner();
    let record = catalog
        .get_by_id(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("video {}", video_id)))?;
    Ok(HttpResponse::Ok().json(VideoDetail::from(&record)))
}

/// GET /api/v1/videos/{id}/status
///
/// Lifecycle status for submission polling
pub async fn get_video_status(
    catalog: web::Data<CatalogService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let video_id = path.into_inner();
    let record = catalog
        .get_by_id(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("video {}", video_id)))?;
    Ok(HttpResponse::Ok().json(VideoStatusResponse {
        video_id,
        status: record.status,
    }))
}

/// PATCH /api/v1/videos/{id}
///
/// Update name, description or tags; omitted fields stay untouched
pub async fn update_video(
    catalog: web::Data<CatalogService>,
    path: web::Path<Uuid>,
    req: web::Json<UpdateVideoRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let payload = req.into_inner();

    let record = catalog
        .update_fields(
            path.into_inner(),
            VideoFieldUpdate {
                name: payload.name,
                description: payload.description,
                tags: payload.tags,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(VideoDetail::from(&record)))
}

/// POST /api/v1/videos/{id}/view
///
/// Record one playback view. This is the only path that increments the
/// view counter; non-deliverable videos are hidden as 404.
pub async fn record_view(
    catalog: web::Data<CatalogService>,
    engagement: web::Data<EngagementService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let video_id = path.into_inner();
    let record = catalog
        .get_by_id(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("video {}", video_id)))?;

    // Records stored without a status field deserialize as READY and
    // stay viewable.
    if record.status != VideoStatus::Ready {
        return Err(AppError::NotFound(format!(
            "video {} is not available",
            video_id
        )));
    }

    engagement.record_view(video_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/v1/videos/{id}/rating
///
/// Submit or replace the caller's 1-5 rating
pub async fn rate_video(
    engagement: web::Data<EngagementService>,
    path: web::Path<Uuid>,
    user: UserId,
    req: web::Json<RateVideoRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    engagement
        .rate_video(path.into_inner(), user.0, req.rating)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/videos/{id}/rating
///
/// Aggregate rating summary
pub async fn get_rating_summary(
    engagement: web::Data<EngagementService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let summary = engagement.get_rating_summary(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// GET /api/v1/videos/{id}/related
///
/// Embedding-nearest videos, excluding the source video itself
pub async fn get_related_videos(
    catalog: web::Data<CatalogService>,
    path: web::Path<Uuid>,
    query: web::Query<RelatedQuery>,
) -> Result<HttpResponse> {
    let limit = query.limit.clamp(1, 20);
    let related = catalog.related_videos(path.into_inner(), limit).await?;
    Ok(HttpResponse::Ok().json(related))
}

/// GET /api/v1/videos/latest
///
/// Newest delivered videos, paginated
pub async fn get_latest_videos(
    catalog: web::Data<CatalogService>,
    config: web::Data<Config>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let (page, page_size) = resolve_page(&query, &config);
    let (data, total) = catalog.list_latest(page, page_size).await?;
    Ok(HttpResponse::Ok().json(PaginatedResponse::new(data, page, page_size, total)))
}

/// GET /api/v1/videos/trending
///
/// Most viewed videos inside the trailing window, as a flat list
pub async fn get_trending_videos(
    engagement: web::Data<EngagementService>,
    query: web::Query<TrendingQuery>,
) -> Result<HttpResponse> {
    let interval_days = query.interval_days.clamp(1, 30);
    let limit = query.limit.clamp(1, 10);
    let trending = engagement.list_trending(interval_days, limit).await?;
    Ok(HttpResponse::Ok().json(trending))
}

/// GET /api/v1/videos/by-tag/{tag}
pub async fn get_videos_by_tag(
    catalog: web::Data<CatalogService>,
    config: web::Data<Config>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let tag = path.into_inner();
    let (page, page_size) = resolve_page(&query, &config);
    let (data, total) = catalog.list_by_tag(&tag, page, page_size).await?;
    Ok(HttpResponse::Ok().json(PaginatedResponse::new(data, page, page_size, total)))
}

/// GET /api/v1/videos/by-uploader/{id}
pub async fn get_videos_by_uploader(
    catalog: web::Data<CatalogService>,
    config: web::Data<Config>,
    path: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let (page, page_size) = resolve_page(&query, &config);
    let (data, total) = catalog
        .list_by_uploader(path.into_inner(), page, page_size)
        .await?;
    Ok(HttpResponse::Ok().json(PaginatedResponse::new(data, page, page_size, total)))
}

/// POST /api/v1/videos/preview
///
/// Resolve the title for a source URL without persisting anything; the
/// client uses it to pre-fill the name field before submitting.
pub async fn preview_video(
    ingestion: web::Data<IngestionService>,
    req: web::Json<SubmitVideoRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let title = ingestion.preview_title(&req.source_url).await?;
    Ok(HttpResponse::Ok().json(PreviewTitleResponse { title }))
}
