/// Configuration management for the video catalog service
///
/// This module handles loading and managing configuration from environment
/// variables. Every tunable that changes pipeline or search behavior lives
/// here and is injected into the owning service at construction time.
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Content store configuration
    pub store: StoreConfig,
    /// Metadata provider configuration
    pub metadata: MetadataConfig,
    /// Embedding generator configuration
    pub embedding: EmbeddingConfig,
    /// Ingestion pipeline configuration
    pub ingestion: IngestionConfig,
    /// Search engine configuration
    pub search: SearchConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Content store configuration
///
/// An empty endpoint selects the in-memory backend, which keeps local
/// development and CI working without a provisioned document database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Document API base endpoint; empty selects the in-memory backend
    pub endpoint: String,
    /// Document API auth token
    pub token: String,
    /// Keyspace (namespace) holding the collections
    pub keyspace: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Table-shaped storage rejects `$inc` and exact counts
    pub table_shape: bool,
}

/// Metadata provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Credential for the authoritative provider; unset skips that provider
    pub api_key: Option<String>,
    /// Per-provider-call timeout in milliseconds
    pub request_timeout_ms: u64,
}

/// Embedding generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider kind: "hash" (local deterministic) or "remote"
    pub provider: String,
    /// Remote model endpoint (remote provider only)
    pub endpoint: String,
    /// Remote model name
    pub model: String,
    /// Remote provider credential
    pub api_key: Option<String>,
    /// Fixed output dimension; changing it invalidates stored embeddings
    pub dimension: usize,
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Resolve metadata synchronously at submission time
    pub inline_metadata: bool,
    /// Spawn the asynchronous follow-up pass after submission
    pub background_processing: bool,
    /// Unconditional delay inside the follow-up pass, in milliseconds
    pub processing_delay_ms: u64,
}

/// Search engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Serve semantic queries; when false, semantic requests degrade to keyword mode
    pub semantic_enabled: bool,
    /// Candidate window multiplier applied per page of depth
    pub overfetch_factor: usize,
    /// Minimum similarity for a candidate to survive the trim; 0 disables the trim
    pub similarity_threshold: f32,
    /// Page size applied when the caller sends none
    pub default_page_size: usize,
    /// Upper bound on caller-requested page sizes
    pub max_page_size: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("VIDEO_CATALOG_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("VIDEO_CATALOG_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8085),
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if app_env.eq_ignore_ascii_case("production") => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if app_env.eq_ignore_ascii_case("production") && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            store: StoreConfig {
                endpoint: std::env::var("STORE_ENDPOINT").unwrap_or_else(|_| "".to_string()),
                token: std::env::var("STORE_TOKEN").unwrap_or_else(|_| "".to_string()),
                keyspace: std::env::var("STORE_KEYSPACE")
                    .unwrap_or_else(|_| "video_catalog".to_string()),
                request_timeout_ms: std::env::var("STORE_REQUEST_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10_000),
                table_shape: std::env::var("STORE_TABLE_SHAPE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(false),
            },
            metadata: MetadataConfig {
                api_key: std::env::var("YOUTUBE_API_KEY")
                    .ok()
                    .filter(|k| !k.trim().is_empty()),
                request_timeout_ms: std::env::var("YOUTUBE_API_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3_000),
            },
            embedding: EmbeddingConfig {
                provider: std::env::var("EMBEDDING_PROVIDER")
                    .unwrap_or_else(|_| "hash".to_string()),
                endpoint: std::env::var("EMBEDDING_ENDPOINT").unwrap_or_else(|_| "".to_string()),
                model: std::env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "all-MiniLM-L6-v2".to_string()),
                api_key: std::env::var("EMBEDDING_API_KEY")
                    .ok()
                    .filter(|k| !k.trim().is_empty()),
                dimension: std::env::var("EMBEDDING_DIMENSION")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(384),
            },
            ingestion: IngestionConfig {
                inline_metadata: std::env::var("INGESTION_INLINE_METADATA")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(true),
                background_processing: std::env::var("INGESTION_BACKGROUND_PROCESSING")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(true),
                processing_delay_ms: std::env::var("INGESTION_PROCESSING_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(500),
            },
            search: SearchConfig {
                semantic_enabled: std::env::var("SEARCH_SEMANTIC_ENABLED")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(true),
                overfetch_factor: std::env::var("SEARCH_OVERFETCH_FACTOR")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3),
                similarity_threshold: parse_env_or_default("SEARCH_SIMILARITY_THRESHOLD", 0.0)?,
                default_page_size: std::env::var("SEARCH_DEFAULT_PAGE_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
                max_page_size: std::env::var("SEARCH_MAX_PAGE_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(100),
            },
        })
    }

    /// True when running with the production environment profile
    pub fn is_production(&self) -> bool {
        self.app.env.eq_ignore_ascii_case("production")
    }
}

fn parse_env_or_default(key: &str, default: f32) -> Result<f32, String> {
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
