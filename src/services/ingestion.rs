/// Ingestion pipeline for submitted video references
///
/// Owns the record lifecycle: PENDING -> PROCESSING -> READY | ERROR,
/// with ERROR recoverable by re-invoking the follow-up pass. Submission
/// parses the source URL, optionally resolves metadata inline, embeds
/// the composite text, and persists the record; the asynchronous pass
/// re-resolves metadata and upgrades the record without regressing
/// state. Nothing here deletes records, and submissions of the same
/// platform key stay independent records.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use uuid::Uuid;

use crate::config::IngestionConfig;
use crate::error::{AppError, Result};
use crate::models::{VideoRecord, VideoStatus};
use crate::services::embedding::Embedder;
use crate::services::metadata::MetadataResolver;
use crate::store::{DocumentStore, Filter, Update, VIDEOS_COLLECTION};

/// Title used until a real one arrives from the caller or a provider
pub const PLACEHOLDER_TITLE: &str = "Video Title Pending Processing";

/// Supported source URL shapes, tried in priority order. Each anchors at
/// the start of the string, tolerates a missing scheme and `www.`, and
/// captures the 11-character platform key.
static URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(?:https?://)?(?:www\.)?youtu\.be/([A-Za-z0-9_-]{11})",
        r"^(?:https?://)?(?:www\.)?youtube\.com/watch\?v=([A-Za-z0-9_-]{11})",
        r"^(?:https?://)?(?:www\.)?youtube\.com/embed/([A-Za-z0-9_-]{11})",
        r"^(?:https?://)?(?:www\.)?youtube\.com/v/([A-Za-z0-9_-]{11})",
        r"^(?:https?://)?(?:www\.)?youtube\.com/shorts/([A-Za-z0-9_-]{11})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("source URL pattern compiles"))
    .collect()
});

/// Extract the platform video key from a submitted URL; first matching
/// shape wins, `None` when no shape matches.
pub fn extract_platform_id(source_url: &str) -> Option<String> {
    for pattern in URL_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(source_url) {
            if let Some(key) = captures.get(1) {
                return Some(key.as_str().to_string());
            }
        }
    }
    None
}

pub struct IngestionService {
    store: Arc<dyn DocumentStore>,
    resolver: Arc<MetadataResolver>,
    embedder: Arc<dyn Embedder>,
    config: IngestionConfig,
}

impl IngestionService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        resolver: Arc<MetadataResolver>,
        embedder: Arc<dyn Embedder>,
        config: IngestionConfig,
    ) -> Self {
        IngestionService {
            store,
            resolver,
            embedder,
            config,
        }
    }

    pub fn background_processing_enabled(&self) -> bool {
        self.config.background_processing
    }

    /// Synchronous submission phase. Fails with `InvalidReference` before
    /// any write when the URL matches no supported shape. In inline mode a
    /// successful resolution persists the record READY immediately; a
    /// failed resolution leaves it PENDING for the follow-up pass.
    pub async fn submit(
        &self,
        source_url: &str,
        title: Option<String>,
        owner_id: Uuid,
    ) -> Result<VideoRecord> {
        let platform_id = extract_platform_id(source_url).ok_or_else(|| {
            AppError::InvalidReference(format!(
                "unable to extract a platform video key from '{}'",
                source_url
            ))
        })?;

        let caller_title = title.filter(|t| !t.trim().is_empty());
        let now = Utc::now();
        let mut record = VideoRecord {
            video_id: Uuid::new_v4(),
            owner_id,
            name: caller_title
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string()),
            description: None,
            tags: Vec::new(),
            source_location: source_url.to_string(),
            source_platform_id: platform_id.clone(),
            preview_image_url: None,
            status: VideoStatus::Pending,
            submitted_at: now,
            last_updated_at: now,
            embedding: None,
            view_count: 0,
            rating_total: 0,
            rating_count: 0,
        };

        if self.config.inline_metadata {
            match self.resolver.resolve(&platform_id).await {
                Ok(metadata) => {
                    if caller_title.is_none() {
                        record.name = metadata.title;
                    }
                    record.description = metadata.description;
                    record.tags = metadata.tags;
                    record.preview_image_url = metadata.thumbnail_url;
                    record.status = VideoStatus::Ready;
                }
                Err(err) => {
                    tracing::warn!(
                        video_id = %record.video_id,
                        error = %err,
                        "inline metadata resolution failed, leaving record PENDING"
                    );
                }
            }
        }

        record.embedding = self.try_embed(&record.composite_text()).await;

        self.store
            .insert_one(VIDEOS_COLLECTION, serde_json::to_value(&record)?)
            .await?;
        tracing::info!(
            video_id = %record.video_id,
            platform_id = %record.source_platform_id,
            status = record.status.as_str(),
            "video submitted"
        );
        Ok(record)
    }

    /// Fire-and-forget follow-up pass. Has no return channel: failures
    /// end as terminal record state (ERROR) or a log line, never as an
    /// error surfaced to the submitter.
    pub async fn process_submission(&self, video_id: Uuid, platform_id: &str) {
        if let Err(err) = self.run_processing_pass(video_id, platform_id).await {
            tracing::error!(%video_id, error = %err, "processing pass aborted");
        }
    }

    async fn run_processing_pass(&self, video_id: Uuid, platform_id: &str) -> Result<()> {
        let record = match self
            .store
            .find_one(VIDEOS_COLLECTION, Filter::by_video_id(video_id))
            .await?
        {
            Some(doc) => serde_json::from_value::<VideoRecord>(doc)?,
            None => {
                tracing::warn!(%video_id, "record missing, nothing to process");
                return Ok(());
            }
        };

        // Re-invocations on an already-delivered record are no-ops.
        if record.status == VideoStatus::Ready {
            tracing::debug!(%video_id, "record already READY");
            return Ok(());
        }

        let metadata = match self.resolver.resolve(platform_id).await {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(%video_id, error = %err, "metadata exhausted, marking record ERROR");
                self.store
                    .update_one(
                        VIDEOS_COLLECTION,
                        Filter::by_video_id(video_id),
                        Update::new()
                            .set("status", json!(VideoStatus::Error))
                            .set("lastUpdatedAt", json!(Utc::now())),
                        false,
                    )
                    .await?;
                return Ok(());
            }
        };

        // Interim snapshot: PROCESSING plus whatever the provider
        // returned. Populated fields are never overwritten with empties.
        let mut interim = Update::new()
            .set("status", json!(VideoStatus::Processing))
            .set("name", json!(metadata.title))
            .set("lastUpdatedAt", json!(Utc::now()));
        if let Some(description) = &metadata.description {
            interim = interim.set("description", json!(description));
        }
        if let Some(thumbnail) = &metadata.thumbnail_url {
            interim = interim.set("previewImageUrl", json!(thumbnail));
        }
        if !metadata.tags.is_empty() {
            interim = interim.set("tags", json!(metadata.tags));
        }
        self.store
            .update_one(
                VIDEOS_COLLECTION,
                Filter::by_video_id(video_id),
                interim,
                false,
            )
            .await?;

        // Post-processing delay; unconditional and not cancellable.
        tokio::time::sleep(Duration::from_millis(self.config.processing_delay_ms)).await;

        let mut refreshed = record;
        refreshed.name = metadata.title;
        if metadata.description.is_some() {
            refreshed.description = metadata.description;
        }
        if !metadata.tags.is_empty() {
            refreshed.tags = metadata.tags;
        }

        let mut terminal = Update::new()
            .set("status", json!(VideoStatus::Ready))
            .set("lastUpdatedAt", json!(Utc::now()));
        if let Some(vector) = self.try_embed(&refreshed.composite_text()).await {
            terminal = terminal.set("embedding", json!(vector));
        }
        self.store
            .update_one(
                VIDEOS_COLLECTION,
                Filter::by_video_id(video_id),
                terminal,
                false,
            )
            .await?;

        tracing::info!(%video_id, "processing pass complete");
        Ok(())
    }

    /// Resolve just the title for a URL, without persisting anything.
    /// Clients use this to pre-fill the name field before submitting.
    pub async fn preview_title(&self, source_url: &str) -> Result<String> {
        let platform_id = extract_platform_id(source_url).ok_or_else(|| {
            AppError::InvalidReference(format!(
                "unable to extract a platform video key from '{}'",
                source_url
            ))
        })?;
        let metadata = self.resolver.resolve(&platform_id).await?;
        Ok(metadata.title)
    }

    async fn try_embed(&self, text: &str) -> Option<Vec<f32>> {
        match self.embedder.embed(text).await {
            Ok(vector) => Some(vector),
            Err(err) => {
                tracing::warn!(
                    model = self.embedder.model_name(),
                    error = %err,
                    "embedding unavailable, leaving it for backfill"
                );
                None
            }
        }
    }
}
