/// Background jobs for the video catalog
///
/// - Embedding backfill: repairs records whose `embedding` is null
pub mod embedding_backfill;

pub use embedding_backfill::{run_backfill, start_embedding_backfill, BackfillReport};
