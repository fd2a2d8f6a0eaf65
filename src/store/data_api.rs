/// Document API store backend
///
/// Speaks the Document API command protocol over HTTP: one POST per
/// operation to `{endpoint}/api/json/v1/{keyspace}/{collection}` with a
/// single-command JSON body (`findOne`, `find`, `insertOne`, `updateOne`,
/// `countDocuments`). Command errors come back in an `errors` array with
/// an `errorCode`; `UNSUPPORTED_TABLE_COMMAND` marks operators the
/// record's storage shape rejects.
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{CountOutcome, DocumentStore, Filter, Sort, StoreError, Update};
use crate::config::StoreConfig;

pub struct DataApiStore {
    client: reqwest::Client,
    base_url: String,
    token: String,
    table_shape: bool,
}

impl DataApiStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        let base_url = format!(
            "{}/api/json/v1/{}",
            config.endpoint.trim_end_matches('/'),
            config.keyspace
        );
        Ok(DataApiStore {
            client,
            base_url,
            token: config.token.clone(),
            table_shape: config.table_shape,
        })
    }

    async fn command(&self, collection: &str, body: Value) -> Result<Value, StoreError> {
        let url = format!("{}/{}", self.base_url, collection);
        let response = self
            .client
            .post(&url)
            .header("Token", &self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await?;

        if let Some(first) = payload
            .get("errors")
            .and_then(Value::as_array)
            .and_then(|errors| errors.first())
        {
            let code = first
                .get("errorCode")
                .and_then(Value::as_str)
                .unwrap_or("UNKNOWN")
                .to_string();
            let message = first
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("document API command failed")
                .to_string();
            return Err(StoreError::Api { code, message });
        }

        if !status.is_success() {
            return Err(StoreError::Api {
                code: format!("HTTP_{}", status.as_u16()),
                message: format!("document API returned {}", status),
            });
        }

        Ok(payload)
    }
}

#[async_trait]
impl DocumentStore for DataApiStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: Filter,
    ) -> Result<Option<Value>, StoreError> {
        let payload = self
            .command(collection, json!({ "findOne": { "filter": filter.to_json() } }))
            .await?;
        let document = &payload["data"]["document"];
        if document.is_null() {
            Ok(None)
        } else {
            Ok(Some(document.clone()))
        }
    }

    async fn find_page(
        &self,
        collection: &str,
        filter: Filter,
        sort: Sort,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<Value>, StoreError> {
        let mut find = serde_json::Map::new();
        find.insert("filter".to_string(), filter.to_json());
        if let Some(sort_json) = sort.to_json() {
            find.insert("sort".to_string(), sort_json);
        }

        let mut options = serde_json::Map::new();
        options.insert("limit".to_string(), json!(limit));
        if skip > 0 {
            options.insert("skip".to_string(), json!(skip));
        }
        if sort.is_similarity() {
            options.insert("includeSimilarity".to_string(), json!(true));
        }
        find.insert("options".to_string(), Value::Object(options));

        let payload = self
            .command(collection, json!({ "find": Value::Object(find) }))
            .await?;
        Ok(payload["data"]["documents"]
            .as_array()
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> Result<(), StoreError> {
        self.command(collection, json!({ "insertOne": { "document": document } }))
            .await?;
        Ok(())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Filter,
        update: Update,
        upsert: bool,
    ) -> Result<(), StoreError> {
        if update.has_increments() && self.table_shape {
            return Err(StoreError::Unsupported("$inc"));
        }

        let mut update_one = serde_json::Map::new();
        update_one.insert("filter".to_string(), filter.to_json());
        update_one.insert("update".to_string(), update.to_json());
        if upsert {
            update_one.insert("options".to_string(), json!({ "upsert": true }));
        }

        self.command(collection, json!({ "updateOne": Value::Object(update_one) }))
            .await?;
        Ok(())
    }

    async fn count_matching(
        &self,
        collection: &str,
        filter: Filter,
    ) -> Result<CountOutcome, StoreError> {
        if self.table_shape {
            return Ok(CountOutcome::Unsupported);
        }

        let result = self
            .command(collection, json!({ "countDocuments": { "filter": filter.to_json() } }))
            .await;
        match result {
            Ok(payload) => Ok(CountOutcome::Exact(
                payload["status"]["count"].as_u64().unwrap_or(0),
            )),
            Err(err) if err.is_unsupported() => Ok(CountOutcome::Unsupported),
            Err(err) => Err(err),
        }
    }

    fn supports_atomic_increment(&self) -> bool {
        !self.table_shape
    }
}
