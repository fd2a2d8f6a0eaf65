//! Embedding backfill tool.
//!
//! Runs one repair pass over records whose `embedding` is null and
//! exits. The long-running service performs the same repair on a timer;
//! this binary exists for operators who want to drive it by hand after
//! an embedding-provider outage or a bulk import.
//!
//! Env vars reused from the service:
//! STORE_ENDPOINT, STORE_TOKEN, STORE_KEYSPACE, EMBEDDING_PROVIDER,
//! EMBEDDING_ENDPOINT, EMBEDDING_MODEL, EMBEDDING_API_KEY, EMBEDDING_DIMENSION.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use video_catalog::jobs::run_backfill;
use video_catalog::services::embedder_from_config;
use video_catalog::store::store_from_config;
use video_catalog::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(anyhow::Error::msg)?;
    let store = store_from_config(&config.store)?;
    let embedder = embedder_from_config(&config.embedding)?;

    tracing::info!(
        provider = %config.embedding.provider,
        dimension = config.embedding.dimension,
        "Running embedding backfill"
    );

    let report = run_backfill(store.as_ref(), embedder.as_ref()).await?;
    tracing::info!(
        scanned = report.scanned,
        repaired = report.repaired,
        failed = report.failed,
        "Embedding backfill finished"
    );

    if report.failed > 0 {
        anyhow::bail!("{} records failed to repair", report.failed);
    }
    Ok(())
}
