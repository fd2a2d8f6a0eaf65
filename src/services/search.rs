/// Query-side retrieval over the videos collection
///
/// Two modes behind one entry point. Semantic mode embeds the query and
/// ranks by vector similarity with a client-side threshold trim over an
/// overfetched candidate window. Keyword mode is a case-insensitive
/// substring match across name, description, and tags, newest first.
/// The mode is configuration-driven; both return the page slice plus a
/// total for pagination envelopes.
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::SearchConfig;
use crate::error::{AppError, Result};
use crate::models::{VideoRecord, VideoStatus, VideoSummary};
use crate::services::embedding::{count_tokens, Embedder, MAX_EMBEDDING_TOKENS};
use crate::store::{
    Condition, CountOutcome, DocumentStore, Filter, Sort, SIMILARITY_FIELD, VIDEOS_COLLECTION,
};

/// Wire name of the vector column on video documents
const EMBEDDING_FIELD: &str = "embedding";

pub struct SearchService {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    config: SearchConfig,
}

impl SearchService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn Embedder>,
        config: SearchConfig,
    ) -> Self {
        SearchService {
            store,
            embedder,
            config,
        }
    }

    /// Search entry point. Out-of-range pagination yields an empty page
    /// rather than an error.
    pub async fn search_videos(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> Result<(Vec<VideoSummary>, usize)> {
        if page < 1 || page_size < 1 {
            return Ok((Vec::new(), 0));
        }
        if self.config.semantic_enabled {
            self.semantic_search(query, page, page_size).await
        } else {
            self.keyword_search(query, page, page_size).await
        }
    }

    /// Vector search with a client-side similarity cutoff.
    ///
    /// Overfetches `page_size * overfetch_factor * page` candidates so
    /// the trim still leaves enough survivors to fill the requested
    /// page. The reported total counts survivors inside that window,
    /// not across the whole collection.
    async fn semantic_search(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> Result<(Vec<VideoSummary>, usize)> {
        let tokens = count_tokens(query);
        if tokens > MAX_EMBEDDING_TOKENS {
            return Err(AppError::QueryTooLong {
                tokens,
                max: MAX_EMBEDDING_TOKENS,
            });
        }

        let vector = self.embedder.embed(query).await?;
        let overfetch = page_size * self.config.overfetch_factor * page;

        let mut docs = self
            .store
            .find_page(
                VIDEOS_COLLECTION,
                Filter::new(),
                Sort::similarity(EMBEDDING_FIELD, vector),
                0,
                overfetch,
            )
            .await?;
        tracing::debug!(fetched = docs.len(), page, overfetch, "vector search fetched");

        let threshold = self.config.similarity_threshold;
        if threshold > 0.0 {
            let before = docs.len();
            docs.retain(|doc| doc_similarity(doc) >= f64::from(threshold));
            tracing::debug!(
                threshold,
                before,
                after = docs.len(),
                "trimmed candidates below similarity threshold"
            );
        }

        let total = docs.len();
        let start = (page - 1) * page_size;
        let summaries = docs
            .into_iter()
            .skip(start)
            .take(page_size)
            .map(summary_from_doc)
            .collect::<Result<Vec<_>>>()?;

        Ok((summaries, total))
    }

    /// Substring fallback over descriptive fields. Stores that cannot
    /// count matches report the page length as the total.
    async fn keyword_search(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
    ) -> Result<(Vec<VideoSummary>, usize)> {
        let filter = Filter::new()
            .eq_or_missing("status", json!(VideoStatus::Ready))
            .any_of(vec![
                Condition::ContainsText("name".to_string(), query.to_string()),
                Condition::ContainsText("description".to_string(), query.to_string()),
                Condition::ContainsText("tags".to_string(), query.to_string()),
            ]);

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
            CountOutcome::Unsupported => {
                tracing::debug!("store cannot count matches, reporting page length");
                docs.len()
            }
        };

        let summaries = docs
            .into_iter()
            .map(summary_from_doc)
            .collect::<Result<Vec<_>>>()?;

        Ok((summaries, total))
    }
}

fn doc_similarity(doc: &Value) -> f64 {
    doc.get(SIMILARITY_FIELD)
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
}

fn summary_from_doc(doc: Value) -> Result<VideoSummary> {
    let record: VideoRecord = serde_json::from_value(doc)?;
    Ok(VideoSummary::from(&record))
}
