/// Content store abstraction for the video catalog
///
/// The catalog persists JSON documents in a table/document hybrid backend.
/// This module defines the operations the service layer consumes:
/// - find_one / find_page (field-ordered or similarity-ranked)
/// - insert_one / update_one (with `$set`/`$inc` parts and upsert)
/// - count_matching, which a table-shaped backend may not support
///
/// Two implementations exist: `DataApiStore` speaks the Document API over
/// HTTP, `InMemoryStore` backs development mode and tests.
pub mod data_api;
pub mod memory;

pub use data_api::DataApiStore;
pub use memory::InMemoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::StoreConfig;

/// Collection holding `VideoRecord` documents
pub const VIDEOS_COLLECTION: &str = "videos";
/// Collection holding `RatingEntry` documents
pub const RATINGS_COLLECTION: &str = "video_ratings";
/// Collection holding append-only `ViewEvent` documents
pub const ACTIVITY_COLLECTION: &str = "video_activity";

/// Field injected into candidates returned by a similarity-sorted find.
/// Scores are in [0, 1], higher is closer.
pub const SIMILARITY_FIELD: &str = "$similarity";

/// Error code the backend returns for document operators applied to
/// table-shaped storage.
pub const UNSUPPORTED_TABLE_COMMAND: &str = "UNSUPPORTED_TABLE_COMMAND";

/// Select the store backend for the configured deployment. An empty
/// endpoint boots the in-memory backend; data written there is lost on
/// restart.
pub fn store_from_config(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    if config.endpoint.is_empty() {
        tracing::warn!("no store endpoint configured, using the in-memory backend");
        return Ok(Arc::new(InMemoryStore::new()));
    }
    Ok(Arc::new(DataApiStore::new(config)?))
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("api error {code}: {message}")]
    Api { code: String, message: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("operation not supported by this storage shape: {0}")]
    Unsupported(&'static str),
}

impl StoreError {
    /// True when the backend rejected the operation for the record's
    /// storage shape rather than failing it.
    pub fn is_unsupported(&self) -> bool {
        match self {
            StoreError::Unsupported(_) => true,
            StoreError::Api { code, .. } => code == UNSUPPORTED_TABLE_COMMAND,
            _ => false,
        }
    }
}

/// One filter clause over a top-level document field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value
    Eq(String, Value),
    /// Field equals the value, or the field is absent from the document
    EqOrMissing(String, Value),
    /// Case-insensitive substring match; on array fields, any element
    ContainsText(String, String),
    /// Field is null or absent
    IsNull(String),
    /// Field is greater than or equal to the bound
    Gte(String, Value),
    /// Field equals one of the values; on array fields, any element
    In(String, Vec<Value>),
}

/// Conjunction of clauses, with an optional disjunctive group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    all: Vec<Condition>,
    any: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Filter::default()
    }

    pub fn by_video_id(video_id: uuid::Uuid) -> Self {
        Filter::new().eq("videoId", json!(video_id))
    }

    pub fn eq(mut self, field: &str, value: Value) -> Self {
        self.all.push(Condition::Eq(field.to_string(), value));
        self
    }

    pub fn eq_or_missing(mut self, field: &str, value: Value) -> Self {
        self.all.push(Condition::EqOrMissing(field.to_string(), value));
        self
    }

    pub fn is_null(mut self, field: &str) -> Self {
        self.all.push(Condition::IsNull(field.to_string()));
        self
    }

    pub fn gte(mut self, field: &str, value: Value) -> Self {
        self.all.push(Condition::Gte(field.to_string(), value));
        self
    }

    pub fn is_in(mut self, field: &str, values: Vec<Value>) -> Self {
        self.all.push(Condition::In(field.to_string(), values));
        self
    }

    /// Add a disjunctive group: at least one of `conditions` must match.
    pub fn any_of(mut self, conditions: Vec<Condition>) -> Self {
        self.any.extend(conditions);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }

    pub fn conjunction(&self) -> &[Condition] {
        &self.all
    }

    pub fn disjunction(&self) -> &[Condition] {
        &self.any
    }

    /// Document API filter representation
    pub fn to_json(&self) -> Value {
        let mut clauses: Vec<Value> = self.all.iter().map(condition_to_json).collect();
        if !self.any.is_empty() {
            let branches: Vec<Value> = self.any.iter().map(condition_to_json).collect();
            clauses.push(json!({ "$or": branches }));
        }
        match clauses.len() {
            0 => json!({}),
            1 => clauses.into_iter().next().unwrap_or_else(|| json!({})),
            _ => json!({ "$and": clauses }),
        }
    }
}

fn condition_to_json(condition: &Condition) -> Value {
    match condition {
        Condition::Eq(field, value) => json!({ field: value }),
        Condition::EqOrMissing(field, value) => json!({
            "$or": [
                { field: value },
                { field: { "$exists": false } },
            ]
        }),
        Condition::ContainsText(field, needle) => json!({
            field: { "$regex": regex::escape(needle), "$options": "i" }
        }),
        Condition::IsNull(field) => json!({
            "$or": [
                { field: Value::Null },
                { field: { "$exists": false } },
            ]
        }),
        Condition::Gte(field, value) => json!({ field: { "$gte": value } }),
        Condition::In(field, values) => json!({ field: { "$in": values } }),
    }
}

/// Result ordering for `find_page`
#[derive(Debug, Clone, PartialEq)]
pub enum Sort {
    Unsorted,
    /// Order by one document field
    Field { name: String, descending: bool },
    /// Rank by similarity to `vector` over the named vector field;
    /// returned documents carry `SIMILARITY_FIELD` and documents without
    /// a stored vector are excluded
    Similarity { field: String, vector: Vec<f32> },
}

impl Sort {
    pub fn descending(name: &str) -> Self {
        Sort::Field {
            name: name.to_string(),
            descending: true,
        }
    }

    pub fn ascending(name: &str) -> Self {
        Sort::Field {
            name: name.to_string(),
            descending: false,
        }
    }

    pub fn similarity(field: &str, vector: Vec<f32>) -> Self {
        Sort::Similarity {
            field: field.to_string(),
            vector,
        }
    }

    pub fn is_similarity(&self) -> bool {
        matches!(self, Sort::Similarity { .. })
    }

    /// Document API sort clause; `None` for unsorted finds
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Sort::Unsorted => None,
            Sort::Field { name, descending } => {
                let direction = if *descending { -1 } else { 1 };
                Some(json!({ name: direction }))
            }
            Sort::Similarity { field, vector } => Some(json!({ field: vector })),
        }
    }
}

/// `$set`/`$inc` update document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: serde_json::Map<String, Value>,
    inc: serde_json::Map<String, Value>,
}

impl Update {
    pub fn new() -> Self {
        Update::default()
    }

    pub fn set(mut self, field: &str, value: Value) -> Self {
        self.set.insert(field.to_string(), value);
        self
    }

    pub fn inc(mut self, field: &str, delta: i64) -> Self {
        self.inc.insert(field.to_string(), json!(delta));
        self
    }

    pub fn set_fields(&self) -> &serde_json::Map<String, Value> {
        &self.set
    }

    pub fn inc_fields(&self) -> &serde_json::Map<String, Value> {
        &self.inc
    }

    pub fn has_increments(&self) -> bool {
        !self.inc.is_empty()
    }

    /// Document API update document
    pub fn to_json(&self) -> Value {
        let mut update = serde_json::Map::new();
        if !self.set.is_empty() {
            update.insert("$set".to_string(), Value::Object(self.set.clone()));
        }
        if !self.inc.is_empty() {
            update.insert("$inc".to_string(), Value::Object(self.inc.clone()));
        }
        Value::Object(update)
    }
}

/// Outcome of `count_matching`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountOutcome {
    Exact(u64),
    /// The storage shape rejects exact counts; callers degrade to the
    /// length of the fetched page
    Unsupported,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, collection: &str, filter: Filter)
        -> Result<Option<Value>, StoreError>;

    async fn find_page(
        &self,
        collection: &str,
        filter: Filter,
        sort: Sort,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Value>, StoreError>;

    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), StoreError>;

    async fn update_one(
        &self,
        collection: &str,
        filter: Filter,
        update: Update,
        upsert: bool,
    ) -> Result<(), StoreError>;

    async fn count_matching(&self, collection: &str, filter: Filter)
        -> Result<CountOutcome, StoreError>;

    /// Table-shaped backends reject `$inc`; callers branch to a
    /// read-modify-write fallback when this returns false.
    fn supports_atomic_increment(&self) -> bool;
}
