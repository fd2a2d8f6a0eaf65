/// Business logic layer for the video catalog
///
/// This module provides high-level operations:
/// - Ingestion: URL parsing, submission, asynchronous processing pass
/// - Metadata: provider chain resolving title/description/thumbnail/tags
/// - Embedding: token budgeting and vector generation
/// - Search: semantic ranking with threshold trim, keyword fallback
/// - Catalog: reads, owner edits, listings, related videos
/// - Engagement: view counters, ratings, trending
pub mod catalog;
pub mod embedding;
pub mod engagement;
pub mod ingestion;
pub mod metadata;
pub mod search;

// Re-export commonly used services
pub use catalog::{CatalogService, VideoFieldUpdate};
pub use embedding::{embedder_from_config, Embedder, HashingEmbedder, RemoteEmbedder};
pub use engagement::EngagementService;
pub use ingestion::{extract_platform_id, IngestionService};
pub use metadata::{MetadataProvider, MetadataResolver, OEmbedProvider, VideoMetadata, YouTubeApiProvider};
pub use search::SearchService;
