/// Embedding generation for discovery
///
/// Maps bounded-length text onto a fixed-dimension vector. The same
/// `Embedder` is used for a video's composite text at ingestion and for
/// search queries, so dimensional compatibility is guaranteed by
/// construction. Inputs are tokenized with a word/punctuation splitter
/// and clipped to a fixed token budget before embedding.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::EmbeddingConfig;

/// Token budget applied to every embedded text
pub const MAX_EMBEDDING_TOKENS: usize = 512;

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+|[^\w\s]").expect("token pattern compiles"));

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider returned malformed payload: {0}")]
    MalformedResponse(String),
    #[error("provider returned {actual} dimensions, expected {expected}")]
    WrongDimension { expected: usize, actual: usize },
    #[error("unknown embedding provider: {0}")]
    UnknownProvider(String),
}

/// Number of tokens the splitter finds in `text`
pub fn count_tokens(text: &str) -> usize {
    TOKEN_PATTERN.find_iter(text).count()
}

/// Truncate `text` to at most `max_tokens` tokens, preserving order and
/// joining with single spaces. Text at or under the budget passes
/// through unchanged.
pub fn clip_to_token_budget(text: &str, max_tokens: usize) -> String {
    let tokens: Vec<&str> = TOKEN_PATTERN.find_iter(text).map(|m| m.as_str()).collect();
    if tokens.len() <= max_tokens {
        return text.to_string();
    }
    tokens[..max_tokens].join(" ")
}

fn prepare_input(text: &str) -> Result<String, EmbeddingError> {
    if text.trim().is_empty() {
        return Err(EmbeddingError::EmptyInput);
    }
    Ok(clip_to_token_budget(text, MAX_EMBEDDING_TOKENS))
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `text` into a vector of exactly `dimension()` components.
    /// Over-budget text is clipped before embedding; empty or
    /// whitespace-only text fails with `EmptyInput`.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Select the embedder implementation the deployment configured
pub fn embedder_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.provider.as_str() {
        "hash" => Ok(Arc::new(HashingEmbedder::new(config.dimension))),
        "remote" => Ok(Arc::new(RemoteEmbedder::new(config)?)),
        other => Err(EmbeddingError::UnknownProvider(other.to_string())),
    }
}

// ========================================
// Local deterministic embedder
// ========================================

/// Deterministic local model: expands a SHA-256 digest of the clipped
/// text into `dimension` centered components, L2-normalized. Carries no
/// semantic signal but keeps every similarity-path property (fixed
/// dimension, determinism, unit norm) testable without credentials.
pub struct HashingEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        HashingEmbedder {
            dimension,
            model_name: format!("hash-projection-{}", dimension),
        }
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let prepared = prepare_input(text)?;
        Ok(hash_to_vector(&prepared, self.dimension))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn hash_to_vector(text: &str, dimension: usize) -> Vec<f32> {
    let mut digest = Sha256::digest(text.as_bytes());
    let mut bytes: Vec<u8> = digest.to_vec();
    let mut counter: u32 = 0;
    while bytes.len() < dimension * 2 {
        counter += 1;
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(counter.to_le_bytes());
        digest = hasher.finalize();
        bytes.extend_from_slice(&digest);
    }

    let mut vector = Vec::with_capacity(dimension);
    for i in 0..dimension {
        let b1 = u16::from(bytes[2 * i]);
        let b2 = u16::from(bytes[2 * i + 1]);
        let combined = (b1 << 8) | b2;
        vector.push(f32::from(combined) / f32::from(u16::MAX) - 0.5);
    }
    l2_normalize(&mut vector);
    vector
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for component in vector.iter_mut() {
            *component /= norm;
        }
    }
}

// ========================================
// Remote model server embedder
// ========================================

const REMOTE_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Embedder backed by a model server speaking the
/// `POST {endpoint}/api/embeddings {model, prompt} -> {embedding}` shape
pub struct RemoteEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

impl RemoteEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(REMOTE_REQUEST_TIMEOUT)
            .build()?;
        Ok(RemoteEmbedder {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let prepared = prepare_input(text)?;

        let mut request = self
            .client
            .post(format!("{}/api/embeddings", self.endpoint))
            .json(&json!({ "model": self.model, "prompt": prepared }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let payload: Value = response.json().await?;

        let components = payload["embedding"].as_array().ok_or_else(|| {
            EmbeddingError::MalformedResponse("missing 'embedding' array".to_string())
        })?;
        let mut vector = Vec::with_capacity(components.len());
        for component in components {
            let value = component.as_f64().ok_or_else(|| {
                EmbeddingError::MalformedResponse("non-numeric embedding component".to_string())
            })?;
            vector.push(value as f32);
        }

        if vector.len() != self.dimension {
            return Err(EmbeddingError::WrongDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
