/// Catalog reads and owner edits
///
/// Everything here serves delivered content: listings filter to READY
/// records (treating records with no stored status as READY), owner
/// edits touch descriptive fields only and never move the lifecycle
/// state or recompute the embedding.
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{RelatedVideo, TagSuggestion, VideoRecord, VideoStatus, VideoSummary};
use crate::store::{
    CountOutcome, DocumentStore, Filter, Sort, Update, SIMILARITY_FIELD, VIDEOS_COLLECTION,
};

/// Recent-record window consulted for tag suggestions
const TAG_SCAN_LIMIT: usize = 2000;

/// Owner-editable descriptive fields; `None` means "leave unchanged"
#[derive(Debug, Clone, Default)]
pub struct VideoFieldUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl VideoFieldUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.tags.is_none()
    }
}

pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        CatalogService { store }
    }

    pub async fn get_by_id(&self, video_id: Uuid) -> Result<Option<VideoRecord>> {
        let doc = self
            .store
            .find_one(VIDEOS_COLLECTION, Filter::by_video_id(video_id))
            .await?;
        match doc {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    /// Apply descriptive-field changes and bump `lastUpdatedAt`. An
    /// update with nothing in it returns the stored record untouched.
    pub async fn update_fields(
        &self,
        video_id: Uuid,
        changes: VideoFieldUpdate,
    ) -> Result<VideoRecord> {
        let mut record = self
            .get_by_id(video_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("video {}", video_id)))?;

        if changes.is_empty() {
            return Ok(record);
        }

        let mut update = Update::new();
        if let Some(name) = changes.name {
            update = update.set("name", json!(name));
            record.name = name;
        }
        if let Some(description) = changes.description {
            update = update.set("description", json!(description));
            record.description = Some(description);
        }
        if let Some(tags) = changes.tags {
            update = update.set("tags", json!(tags));
            record.tags = tags;
        }
        let now = Utc::now();
        update = update.set("lastUpdatedAt", json!(now));
        record.last_updated_at = now;

        self.store
            .update_one(
                VIDEOS_COLLECTION,
                Filter::by_video_id(video_id),
                update,
                false,
            )
            .await?;
        Ok(record)
    }

    pub async fn list_latest(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<(Vec<VideoSummary>, usize)> {
        self.list_with_filter(delivered_filter(), page, page_size)
            .await
    }

    pub async fn list_by_tag(
        &self,
        tag: &str,
        page: usize,
        page_size: usize,
    ) -> Result<(Vec<VideoSummary>, usize)> {
        let filter = delivered_filter().is_in("tags", vec![json!(tag)]);
        self.list_with_filter(filter, page, page_size).await
    }

    pub async fn list_by_uploader(
        &self,
        owner_id: Uuid,
        page: usize,
        page_size: usize,
    ) -> Result<(Vec<VideoSummary>, usize)> {
        let filter = delivered_filter().eq("ownerId", json!(owner_id));
        self.list_with_filter(filter, page, page_size).await
    }

    /// Shared listing path: newest first, plus a total for the
    /// pagination envelope. Stores that cannot count matches report the
    /// page length as the total.
    async fn list_with_filter(
        &self,
        filter: Filter,
        page: usize,
        page_size: usize,
    ) -> Result<(Vec<VideoSummary>, usize)> {
        if page < 1 || page_size < 1 {
            return Ok((Vec::new(), 0));
        }

        let skip = (page - 1) * page_size;
        let docs = self
            .store
            .find_page(
                VIDEOS_COLLECTION,
                filter.clone(),
                Sort::descending("submittedAt"),
                skip,
                page_size,
            )
            .await?;

        let total = match self.store.count_matching(VIDEOS_COLLECTION, filter).await? {
            CountOutcome::Exact(count) => count as usize,
            CountOutcome::Unsupported => docs.len(),
        };

        let mut summaries = Vec::with_capacity(docs.len());
        for doc in docs {
            let record: VideoRecord = serde_json::from_value(doc)?;
            summaries.push(VideoSummary::from(&record));
        }
        Ok((summaries, total))
    }

    /// Tag autocomplete over the most recent delivered records
    pub async fn suggest_tags(&self, query: &str, limit: usize) -> Result<Vec<TagSuggestion>> {
        let docs = self
            .store
            .find_page(
                VIDEOS_COLLECTION,
                delivered_filter(),
                Sort::descending("submittedAt"),
                0,
                TAG_SCAN_LIMIT,
            )
            .await?;

        let mut tags: BTreeSet<String> = BTreeSet::new();
        for doc in &docs {
            if let Some(items) = doc.get("tags").and_then(Value::as_array) {
                for item in items {
                    if let Some(tag) = item.as_str() {
                        tags.insert(tag.to_string());
                    }
                }
            }
        }

        let needle = query.to_lowercase();
        Ok(tags
            .into_iter()
            .filter(|tag| tag.to_lowercase().contains(&needle))
            .take(limit)
            .map(|tag| TagSuggestion { tag })
            .collect())
    }

    /// Content-based neighbors ranked by the video's own embedding.
    /// A video without an embedding has no neighbors yet.
    pub async fn related_videos(
        &self,
        video_id: Uuid,
        limit: usize,
    ) -> Result<Vec<RelatedVideo>> {
        let record = self
            .get_by_id(video_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("video {}", video_id)))?;

        let embedding = match record.embedding {
            Some(embedding) => embedding,
            None => return Ok(Vec::new()),
        };

        // One extra candidate covers the source video ranking first.
        let docs = self
            .store
            .find_page(
                VIDEOS_COLLECTION,
                Filter::new(),
                Sort::similarity("embedding", embedding),
                0,
                limit + 1,
            )
            .await?;

        let mut related = Vec::with_capacity(limit);
        for doc in docs {
            let score = doc
                .get(SIMILARITY_FIELD)
                .and_then(Value::as_f64)
                .unwrap_or(0.0) as f32;
            let candidate: VideoRecord = serde_json::from_value(doc)?;
            if candidate.video_id == video_id {
                continue;
            }
            if related.len() >= limit {
                break;
            }
            related.push(RelatedVideo {
                video_id: candidate.video_id,
                name: candidate.name,
                preview_image_url: candidate.preview_image_url,
                score,
            });
        }
        Ok(related)
    }
}

fn delivered_filter() -> Filter {
    Filter::new().eq_or_missing("status", json!(VideoStatus::Ready))
}
