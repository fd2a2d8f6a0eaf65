/// Engagement aggregation: view counters, ratings, trending
///
/// View counts prefer the store's atomic increment and fall back to a
/// read-increment-write cycle on storage shapes that reject `$inc`.
/// Sequential calls never lose an update on the fallback path; two
/// racing callers may both read the same base value and one increment
/// is lost. Ratings are one row per (videoId, userId) with a full
/// recompute of the aggregate after every write.
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{RatingEntry, RatingSummary, TrendingVideo, VideoRecord, ViewEvent};
use crate::store::{
    DocumentStore, Filter, Sort, Update, ACTIVITY_COLLECTION, RATINGS_COLLECTION, VIDEOS_COLLECTION,
};

/// Per-video rating rows stay small enough to scan in one page
const RATING_SCAN_LIMIT: usize = 10_000;
/// Upper bound on activity rows consulted for one trending query
const ACTIVITY_SCAN_LIMIT: usize = 50_000;

pub struct EngagementService {
    store: Arc<dyn DocumentStore>,
}

impl EngagementService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        EngagementService { store }
    }

    /// Best-effort view increment. The activity event append is also
    /// best-effort: a failure there is logged and never fails the call.
    pub async fn record_view(&self, video_id: Uuid) -> Result<()> {
        if self.store.supports_atomic_increment() {
            match self
                .store
                .update_one(
                    VIDEOS_COLLECTION,
                    Filter::by_video_id(video_id),
                    Update::new().inc("viewCount", 1),
                    false,
                )
                .await
            {
                Ok(()) => {}
                Err(err) if err.is_unsupported() => {
                    self.reread_increment(video_id).await?;
                }
                Err(err) => return Err(err.into()),
            }
        } else {
            self.reread_increment(video_id).await?;
        }

        let event = ViewEvent {
            video_id,
            viewed_at: Utc::now(),
        };
        match serde_json::to_value(&event) {
            Ok(doc) => {
                if let Err(err) = self.store.insert_one(ACTIVITY_COLLECTION, doc).await {
                    tracing::warn!(%video_id, error = %err, "view event append failed");
                }
            }
            Err(err) => {
                tracing::warn!(%video_id, error = %err, "view event append failed");
            }
        }
        Ok(())
    }

    /// Fallback counter path for storage shapes without `$inc`: read the
    /// current value, write value + 1.
    async fn reread_increment(&self, video_id: Uuid) -> Result<()> {
        let doc = self
            .store
            .find_one(VIDEOS_COLLECTION, Filter::by_video_id(video_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("video {}", video_id)))?;

        let current = doc.get("viewCount").and_then(Value::as_u64).unwrap_or(0);
        self.store
            .update_one(
                VIDEOS_COLLECTION,
                Filter::by_video_id(video_id),
                Update::new().set("viewCount", json!(current + 1)),
                false,
            )
            .await?;
        Ok(())
    }

    /// Record or replace the caller's rating, then recompute the
    /// aggregate from every rating row for the video.
    pub async fn rate_video(
        &self,
        video_id: Uuid,
        user_id: Uuid,
        value: u32,
    ) -> Result<RatingSummary> {
        if !(1..=5).contains(&value) {
            return Err(AppError::Validation(format!(
                "rating must be between 1 and 5, got {}",
                value
            )));
        }

        self.require_video(video_id).await?;

        let rating_filter = Filter::new()
            .eq("videoId", json!(video_id))
            .eq("userId", json!(user_id));
        self.store
            .update_one(
                RATINGS_COLLECTION,
                rating_filter,
                Update::new()
                    .set("value", json!(value))
                    .set("ratedAt", json!(Utc::now())),
                true,
            )
            .await?;

        let rows = self
            .store
            .find_page(
                RATINGS_COLLECTION,
                Filter::new().eq("videoId", json!(video_id)),
                Sort::Unsorted,
                0,
                RATING_SCAN_LIMIT,
            )
            .await?;

        let mut rating_total: u64 = 0;
        let mut rating_count: u64 = 0;
        for row in &rows {
            let entry: RatingEntry = serde_json::from_value(row.clone())?;
            rating_total += u64::from(entry.value);
            rating_count += 1;
        }

        self.store
            .update_one(
                VIDEOS_COLLECTION,
                Filter::by_video_id(video_id),
                Update::new()
                    .set("ratingTotal", json!(rating_total))
                    .set("ratingCount", json!(rating_count)),
                false,
            )
            .await?;

        tracing::debug!(%video_id, rating_total, rating_count, "rating aggregate recomputed");
        Ok(summary(video_id, rating_total, rating_count))
    }

    /// Aggregate read straight off the video record
    pub async fn get_rating_summary(&self, video_id: Uuid) -> Result<RatingSummary> {
        let record = self.require_video(video_id).await?;
        Ok(summary(video_id, record.rating_total, record.rating_count))
    }

    /// Most-viewed videos inside the trailing window, ranked by the
    /// number of activity events per video.
    pub async fn list_trending(
        &self,
        interval_days: u32,
        limit: usize,
    ) -> Result<Vec<TrendingVideo>> {
        let cutoff = Utc::now() - Duration::days(i64::from(interval_days));
        let events = self
            .store
            .find_page(
                ACTIVITY_COLLECTION,
                Filter::new().gte("viewedAt", json!(cutoff)),
                Sort::Unsorted,
                0,
                ACTIVITY_SCAN_LIMIT,
            )
            .await?;

        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for event in &events {
            let event: ViewEvent = serde_json::from_value(event.clone())?;
            *counts.entry(event.video_id).or_insert(0) += 1;
        }

        let mut ranked: Vec<(Uuid, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(limit);

        let mut trending = Vec::with_capacity(ranked.len());
        for (video_id, recent_views) in ranked {
            let doc = self
                .store
                .find_one(VIDEOS_COLLECTION, Filter::by_video_id(video_id))
                .await?;
            let record: VideoRecord = match doc {
                Some(doc) => serde_json::from_value(doc)?,
                None => {
                    tracing::debug!(%video_id, "activity references a missing record, skipping");
                    continue;
                }
            };
            trending.push(TrendingVideo {
                video_id,
                name: record.name,
                preview_image_url: record.preview_image_url,
                recent_views,
            });
        }
        Ok(trending)
    }

    async fn require_video(&self, video_id: Uuid) -> Result<VideoRecord> {
        let doc = self
            .store
            .find_one(VIDEOS_COLLECTION, Filter::by_video_id(video_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("video {}", video_id)))?;
        Ok(serde_json::from_value(doc)?)
    }
}

fn summary(video_id: Uuid, rating_total: u64, rating_count: u64) -> RatingSummary {
    let average = if rating_count > 0 {
        Some(rating_total as f64 / rating_count as f64)
    } else {
        None
    };
    RatingSummary {
        video_id,
        rating_total,
        rating_count,
        average,
    }
}
