/// Video Catalog Service Library
///
/// Handles video submission, ingestion lifecycle, metadata resolution,
/// semantic search, and engagement aggregation for the Nova platform.
/// Storage goes through a pluggable JSON document store so the service
/// runs against a hosted Document API or fully in memory.
///
/// # Modules
///
/// - `handlers`: Video and search HTTP request handlers
/// - `models`: Catalog records, engagement rows, and response DTOs
/// - `services`: Business logic layer (ingestion, metadata, embedding,
///   search, catalog, engagement)
/// - `store`: Document store abstraction and backends
/// - `jobs`: Background maintenance jobs
/// - `middleware`: Caller identity extraction
/// - `openapi`: OpenAPI documentation assembly
/// - `error`: Error types and handling
/// - `config`: Configuration management
pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, Result};
