/// Search handlers - HTTP endpoints for video search and tag suggestions
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::config::Config;
use crate::error::Result;
use crate::models::PaginatedResponse;
use crate::services::{CatalogService, SearchService};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchVideosQuery {
    #[validate(length(min = 1))]
    pub query: String,
    #[serde(default = "default_page")]
    pub page: usize,
    pub page_size: Option<usize>,
}

fn default_page() -> usize {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct SuggestTagsQuery {
    #[validate(length(min = 1))]
    pub query: String,
    #[serde(default = "default_suggest_limit")]
    pub limit: usize,
}

fn default_suggest_limit() -> usize {
    10
}

/// GET /api/v1/search/videos
///
/// Ranked video search; semantic when enabled, keyword otherwise
pub async fn search_videos(
    search: web::Data<SearchService>,
    config: web::Data<Config>,
    query: web::Query<SearchVideosQuery>,
) -> Result<HttpResponse> {
    query.validate()?;
    let page = query.page.max(1);
    let page_size = query
        .page_size
        .unwrap_or(config.search.default_page_size)
        .clamp(1, config.search.max_page_size);

    let (data, total) = search.search_videos(&query.query, page, page_size).await?;
    Ok(HttpResponse::Ok().json(PaginatedResponse::new(data, page, page_size, total)))
}

/// GET /api/v1/search/tags/suggest
///
/// Tag autocomplete over recently delivered videos
pub async fn suggest_tags(
    catalog: web::Data<CatalogService>,
    query: web::Query<SuggestTagsQuery>,
) -> Result<HttpResponse> {
    query.validate()?;
    let limit = query.limit.clamp(1, 25);
    let suggestions = catalog.suggest_tags(&query.query, limit).await?;
    Ok(HttpResponse::Ok().json(suggestions))
}
