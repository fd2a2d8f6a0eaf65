//! Embedding Backfill Background Job
//!
//! Repairs records whose `embedding` field is null. Null embeddings
//! accumulate from:
//! - submissions persisted while the embedding provider was unavailable
//! - records written before the vector field existed
//!
//! Each cycle scans one window of unembedded records, recomputes the
//! vector from the record's composite text, and writes it back. Records
//! that fail to embed are counted and retried on the next cycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::error::Result;
use crate::models::VideoRecord;
use crate::services::embedding::Embedder;
use crate::store::{DocumentStore, Filter, Sort, Update, VIDEOS_COLLECTION};

/// Check interval between backfill cycles
const CHECK_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Records repaired per cycle
const SCAN_LIMIT: usize = 500;

/// Outcome of one backfill pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    pub scanned: usize,
    pub repaired: usize,
    pub failed: usize,
}

pub async fn start_embedding_backfill(store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>) {
    tracing::info!(
        "Starting embedding backfill background job (check_interval={}s, scan_limit={})",
        CHECK_INTERVAL.as_secs(),
        SCAN_LIMIT
    );

    loop {
        sleep(CHECK_INTERVAL).await;

        tracing::info!("Running embedding backfill cycle");
        let cycle_start = Instant::now();

        match run_backfill(store.as_ref(), embedder.as_ref()).await {
            Ok(report) => {
                tracing::info!(
                    scanned = report.scanned,
                    repaired = report.repaired,
                    failed = report.failed,
                    duration_ms = cycle_start.elapsed().as_millis(),
                    "Embedding backfill cycle completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    duration_ms = cycle_start.elapsed().as_millis(),
                    "Embedding backfill cycle failed"
                );
            }
        }
    }
}

/// One repair pass over a window of unembedded records
pub async fn run_backfill(
    store: &dyn DocumentStore,
    embedder: &dyn Embedder,
) -> Result<BackfillReport> {
    use futures::stream::{self, StreamExt};

    const CONCURRENT_REPAIRS: usize = 8;

    let docs = store
        .find_page(
            VIDEOS_COLLECTION,
            Filter::new().is_null("embedding"),
            Sort::Unsorted,
            0,
            SCAN_LIMIT,
        )
        .await?;

    let mut report = BackfillReport {
        scanned: docs.len(),
        ..BackfillReport::default()
    };

    let results: Vec<anyhow::Result<()>> = stream::iter(docs)
        .map(|doc| async move { repair_record(store, embedder, doc).await })
        .buffer_unordered(CONCURRENT_REPAIRS)
        .collect()
        .await;

    for result in results {
        match result {
            Ok(()) => report.repaired += 1,
            Err(err) => {
                tracing::warn!(error = %err, "record repair failed");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

async fn repair_record(
    store: &dyn DocumentStore,
    embedder: &dyn Embedder,
    doc: Value,
) -> anyhow::Result<()> {
    let record: VideoRecord = serde_json::from_value(doc).context("malformed record")?;
    let vector = embedder
        .embed(&record.composite_text())
        .await
        .with_context(|| format!("embedding failed for {}", record.video_id))?;
    store
        .update_one(
            VIDEOS_COLLECTION,
            Filter::by_video_id(record.video_id),
            Update::new().set("embedding", json!(vector)),
            false,
        )
        .await
        .with_context(|| format!("embedding write failed for {}", record.video_id))?;
    Ok(())
}
