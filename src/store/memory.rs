/// In-memory document store
///
/// Backs development mode (no store endpoint configured) and tests. The
/// matching, ordering, and upsert semantics mirror the Document API
/// backend, including the storage-shape quirks: builders can switch off
/// atomic increments and exact counts to emulate table-shaped storage.
use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::{
    Condition, CountOutcome, DocumentStore, Filter, Sort, StoreError, Update, SIMILARITY_FIELD,
};

pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    atomic_increments: bool,
    exact_counts: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            collections: RwLock::new(HashMap::new()),
            atomic_increments: true,
            exact_counts: true,
        }
    }

    /// Emulate table-shaped storage that rejects `$inc`
    pub fn without_atomic_increments(mut self) -> Self {
        self.atomic_increments = false;
        self
    }

    /// Emulate table-shaped storage that rejects exact counts
    pub fn without_exact_counts(mut self) -> Self {
        self.exact_counts = false;
        self
    }

    /// Number of documents currently held by a collection
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: Filter,
    ) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        let docs = match collections.get(collection) {
            Some(docs) => docs,
            None => return Ok(None),
        };
        Ok(docs.iter().find(|doc| matches(&filter, doc)).cloned())
    }

    async fn find_page(
        &self,
        collection: &str,
        filter: Filter,
        sort: Sort,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        let docs = match collections.get(collection) {
            Some(docs) => docs,
            None => return Ok(Vec::new()),
        };

        let mut matched: Vec<Value> = docs
            .iter()
            .filter(|doc| matches(&filter, doc))
            .cloned()
            .collect();

        match &sort {
            Sort::Unsorted => {}
            Sort::Field { name, descending } => {
                matched.sort_by(|a, b| {
                    let ordering = compare_field(a.get(name.as_str()), b.get(name.as_str()));
                    if *descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                });
            }
            Sort::Similarity { field, vector } => {
                // Documents without a stored vector cannot be ranked and are
                // excluded, matching the backend's vector-sort behavior.
                let mut scored: Vec<(Value, f32)> = matched
                    .into_iter()
                    .filter_map(|doc| {
                        let stored = read_vector(doc.get(field.as_str()))?;
                        let score = (1.0 + cosine_similarity(vector, &stored)) / 2.0;
                        Some((doc, score))
                    })
                    .collect();
                scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
                matched = scored
                    .into_iter()
                    .map(|(mut doc, score)| {
                        if let Some(object) = doc.as_object_mut() {
                            object.insert(SIMILARITY_FIELD.to_string(), json!(score));
                        }
                        doc
                    })
                    .collect();
            }
        }

        Ok(matched.into_iter().skip(skip).take(limit).collect())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Filter,
        update: Update,
        upsert: bool,
    ) -> Result<(), StoreError> {
        if update.has_increments() && !self.atomic_increments {
            return Err(StoreError::Unsupported("$inc"));
        }

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        if let Some(doc) = docs.iter_mut().find(|doc| matches(&filter, doc)) {
            apply_update(doc, &update);
            return Ok(());
        }

        if upsert {
            let mut doc = seed_from_filter(&filter);
            apply_update(&mut doc, &update);
            docs.push(doc);
        }
        Ok(())
    }

    async fn count_matching(
        &self,
        collection: &str,
        filter: Filter,
    ) -> Result<CountOutcome, StoreError> {
        if !self.exact_counts {
            return Ok(CountOutcome::Unsupported);
        }
        let collections = self.collections.read().await;
        let count = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| matches(&filter, doc)).count())
            .unwrap_or(0);
        Ok(CountOutcome::Exact(count as u64))
    }

    fn supports_atomic_increment(&self) -> bool {
        self.atomic_increments
    }
}

fn matches(filter: &Filter, doc: &Value) -> bool {
    filter
        .conjunction()
        .iter()
        .all(|condition| condition_matches(condition, doc))
        && (filter.disjunction().is_empty()
            || filter
                .disjunction()
                .iter()
                .any(|condition| condition_matches(condition, doc)))
}

fn condition_matches(condition: &Condition, doc: &Value) -> bool {
    match condition {
        Condition::Eq(field, value) => doc.get(field) == Some(value),
        Condition::EqOrMissing(field, value) => match doc.get(field) {
            None => true,
            Some(stored) => stored == value,
        },
        Condition::ContainsText(field, needle) => {
            let needle = needle.to_lowercase();
            match doc.get(field) {
                Some(Value::String(text)) => text.to_lowercase().contains(&needle),
                Some(Value::Array(items)) => items.iter().any(|item| {
                    item.as_str()
                        .map(|text| text.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                }),
                _ => false,
            }
        }
        Condition::IsNull(field) => matches!(doc.get(field), None | Some(Value::Null)),
        Condition::Gte(field, bound) => match doc.get(field) {
            Some(stored) => compare_field(Some(stored), Some(bound)) != Ordering::Less,
            None => false,
        },
        Condition::In(field, values) => match doc.get(field) {
            // On array fields, membership of any element
            Some(Value::Array(items)) => items.iter().any(|item| values.contains(item)),
            Some(stored) => values.contains(stored),
            None => false,
        },
    }
}

/// Field ordering: numbers numerically, strings lexically (RFC 3339
/// timestamps order correctly this way), absent fields sort first.
fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn read_vector(value: Option<&Value>) -> Option<Vec<f32>> {
    let items = value?.as_array()?;
    let mut vector = Vec::with_capacity(items.len());
    for item in items {
        vector.push(item.as_f64()? as f32);
    }
    Some(vector)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn apply_update(doc: &mut Value, update: &Update) {
    let object = match doc.as_object_mut() {
        Some(object) => object,
        None => return,
    };
    for (field, value) in update.set_fields() {
        object.insert(field.clone(), value.clone());
    }
    for (field, delta) in update.inc_fields() {
        let current = object
            .get(field)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        let delta = delta.as_i64().unwrap_or(0);
        object.insert(field.clone(), json!(current + delta));
    }
}

/// Upsert seed: equality clauses become fields of the new document,
/// mirroring the backend's upsert behavior.
fn seed_from_filter(filter: &Filter) -> Value {
    let mut object = serde_json::Map::new();
    for condition in filter.conjunction() {
        match condition {
            Condition::Eq(field, value) | Condition::EqOrMissing(field, value) => {
                object.insert(field.clone(), value.clone());
            }
            _ => {}
        }
    }
    Value::Object(object)
}
