/// Metadata resolution for submitted videos
///
/// Given a platform video key, returns title/description/thumbnail/tags
/// by trying an ordered chain of providers:
///
/// 1. Data API v3 (requires a credential; rich metadata including tags)
/// 2. Public oEmbed endpoint (key-less; title and thumbnail only)
///
/// Every provider failure (network, non-success status, malformed
/// payload, missing title, deadline exceeded) falls through to the next
/// provider; resolution fails only when the chain is exhausted.
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::MetadataConfig;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider returned HTTP {status}")]
    Status { status: u16 },
    #[error("provider returned no snippet for the video")]
    NoSnippet,
    #[error("provider payload missing a title")]
    MissingTitle,
    #[error("all metadata providers failed, last: {0}")]
    Exhausted(String),
}

/// Canonical provider output
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, platform_id: &str) -> Result<VideoMetadata, MetadataError>;
}

// ========================================
// Data API v3 provider
// ========================================

pub struct YouTubeApiProvider {
    client: reqwest::Client,
    api_key: String,
}

impl YouTubeApiProvider {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(YouTubeApiProvider { client, api_key })
    }
}

#[async_trait]
impl MetadataProvider for YouTubeApiProvider {
    fn name(&self) -> &'static str {
        "data-api-v3"
    }

    async fn fetch(&self, platform_id: &str) -> Result<VideoMetadata, MetadataError> {
        let url = format!(
            "https://www.googleapis.com/youtube/v3/videos?part=snippet&id={}&key={}",
            platform_id, self.api_key
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(MetadataError::Status {
                status: response.status().as_u16(),
            });
        }
        let payload: Value = response.json().await?;
        parse_snippet(&payload)
    }
}

/// Parse a Data API v3 `videos?part=snippet` payload
fn parse_snippet(payload: &Value) -> Result<VideoMetadata, MetadataError> {
    let snippet = payload["items"]
        .get(0)
        .map(|item| &item["snippet"])
        .filter(|snippet| snippet.is_object())
        .ok_or(MetadataError::NoSnippet)?;

    let title = snippet["title"].as_str().unwrap_or("").to_string();
    if title.is_empty() {
        return Err(MetadataError::MissingTitle);
    }

    let description = snippet["description"]
        .as_str()
        .filter(|text| !text.is_empty())
        .map(str::to_string);
    let tags = snippet["tags"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(VideoMetadata {
        title,
        description,
        thumbnail_url: pick_thumbnail(&snippet["thumbnails"]),
        tags,
    })
}

/// Thumbnail variants in preference order
fn pick_thumbnail(thumbnails: &Value) -> Option<String> {
    for variant in ["maxres", "high", "default"] {
        if let Some(url) = thumbnails[variant]["url"].as_str() {
            if !url.is_empty() {
                return Some(url.to_string());
            }
        }
    }
    None
}

// ========================================
// oEmbed provider
// ========================================

pub struct OEmbedProvider {
    client: reqwest::Client,
}

impl OEmbedProvider {
    pub fn new(timeout: Duration) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(OEmbedProvider { client })
    }
}

#[async_trait]
impl MetadataProvider for OEmbedProvider {
    fn name(&self) -> &'static str {
        "oembed"
    }

    async fn fetch(&self, platform_id: &str) -> Result<VideoMetadata, MetadataError> {
        let url = format!(
            "https://www.youtube.com/oembed?format=json&url=https://youtu.be/{}",
            platform_id
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(MetadataError::Status {
                status: response.status().as_u16(),
            });
        }
        let payload: Value = response.json().await?;
        parse_oembed(&payload, platform_id)
    }
}

/// Parse an oEmbed payload; oEmbed carries no description or tags
fn parse_oembed(payload: &Value, platform_id: &str) -> Result<VideoMetadata, MetadataError> {
    let title = payload["title"].as_str().unwrap_or("").to_string();
    if title.is_empty() {
        return Err(MetadataError::MissingTitle);
    }

    let thumbnail_url = payload["thumbnail_url"]
        .as_str()
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", platform_id));

    Ok(VideoMetadata {
        title,
        description: None,
        thumbnail_url: Some(thumbnail_url),
        tags: Vec::new(),
    })
}

// ========================================
// Resolver chain
// ========================================

/// Ordered provider chain with short-circuit on first success
pub struct MetadataResolver {
    providers: Vec<Box<dyn MetadataProvider>>,
}

impl MetadataResolver {
    pub fn new(providers: Vec<Box<dyn MetadataProvider>>) -> Self {
        MetadataResolver { providers }
    }

    /// Build the deployment's chain: the credentialed provider leads when
    /// a credential is configured, oEmbed always terminates the chain.
    pub fn from_config(config: &MetadataConfig) -> Result<Self, MetadataError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let mut providers: Vec<Box<dyn MetadataProvider>> = Vec::new();
        if let Some(api_key) = &config.api_key {
            providers.push(Box::new(YouTubeApiProvider::new(api_key.clone(), timeout)?));
        }
        providers.push(Box::new(OEmbedProvider::new(timeout)?));
        Ok(MetadataResolver::new(providers))
    }

    pub async fn resolve(&self, platform_id: &str) -> Result<VideoMetadata, MetadataError> {
        let mut last_failure = String::from("no providers configured");
        for provider in &self.providers {
            match provider.fetch(platform_id).await {
                Ok(metadata) => {
                    tracing::debug!(
                        provider = provider.name(),
                        platform_id,
                        "metadata resolved"
                    );
                    return Ok(metadata);
                }
                Err(err) => {
                    tracing::warn!(
                        provider = provider.name(),
                        platform_id,
                        error = %err,
                        "metadata provider failed, trying next"
                    );
                    last_failure = format!("{}: {}", provider.name(), err);
                }
            }
        }
        Err(MetadataError::Exhausted(last_failure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use serde_json::json;

    mock! {
        Provider {}

        #[async_trait]
        impl MetadataProvider for Provider {
            fn name(&self) -> &'static str;
            async fn fetch(&self, platform_id: &str) -> Result<VideoMetadata, MetadataError>;
        }
    }

    fn sample_metadata(title: &str) -> VideoMetadata {
        VideoMetadata {
            title: title.to_string(),
            description: None,
            thumbnail_url: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_parse_snippet_extracts_rich_metadata() {
        let payload = json!({
            "items": [{
                "snippet": {
                    "title": "Deep Sea Documentary",
                    "description": "Creatures of the abyss",
                    "tags": ["ocean", "documentary"],
                    "thumbnails": {
                        "default": { "url": "https://i.ytimg.com/vi/x/default.jpg" },
                        "high": { "url": "https://i.ytimg.com/vi/x/hqdefault.jpg" }
                    }
                }
            }]
        });

        let metadata = parse_snippet(&payload).unwrap();
        assert_eq!(metadata.title, "Deep Sea Documentary");
        assert_eq!(metadata.description.as_deref(), Some("Creatures of the abyss"));
        assert_eq!(metadata.tags, vec!["ocean", "documentary"]);
        // "high" outranks "default" when "maxres" is absent
        assert_eq!(
            metadata.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/vi/x/hqdefault.jpg")
        );
    }

    #[test]
    fn test_parse_snippet_rejects_empty_payloads() {
        assert!(matches!(
            parse_snippet(&json!({ "items": [] })),
            Err(MetadataError::NoSnippet)
        ));
        assert!(matches!(
            parse_snippet(&json!({ "items": [{ "snippet": { "title": "" } }] })),
            Err(MetadataError::MissingTitle)
        ));
    }

    #[test]
    fn test_parse_oembed_defaults_thumbnail() {
        let metadata = parse_oembed(&json!({ "title": "T" }), "AAAAAAAAAAA").unwrap();
        assert_eq!(metadata.title, "T");
        assert_eq!(
            metadata.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/vi/AAAAAAAAAAA/hqdefault.jpg")
        );
        assert!(metadata.tags.is_empty());

        assert!(matches!(
            parse_oembed(&json!({}), "AAAAAAAAAAA"),
            Err(MetadataError::MissingTitle)
        ));
    }

    #[tokio::test]
    async fn test_resolver_short_circuits_on_first_success() {
        let mut first = MockProvider::new();
        first.expect_name().return_const("first");
        first
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(sample_metadata("from first")));

        let mut second = MockProvider::new();
        second.expect_name().return_const("second");
        second.expect_fetch().times(0);

        let resolver = MetadataResolver::new(vec![Box::new(first), Box::new(second)]);
        let metadata = resolver.resolve("AAAAAAAAAAA").await.unwrap();
        assert_eq!(metadata.title, "from first");
    }

    #[tokio::test]
    async fn test_resolver_falls_back_on_failure() {
        let mut first = MockProvider::new();
        first.expect_name().return_const("first");
        first
            .expect_fetch()
            .times(1)
            .returning(|_| Err(MetadataError::Status { status: 500 }));

        let mut second = MockProvider::new();
        second.expect_name().return_const("second");
        second
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(sample_metadata("fallback")));

        let resolver = MetadataResolver::new(vec![Box::new(first), Box::new(second)]);
        let metadata = resolver.resolve("AAAAAAAAAAA").await.unwrap();
        assert_eq!(metadata.title, "fallback");
    }

    #[tokio::test]
    async fn test_resolver_exhausts_to_error() {
        let mut first = MockProvider::new();
        first.expect_name().return_const("first");
        first
            .expect_fetch()
            .returning(|_| Err(MetadataError::Status { status: 500 }));

        let mut second = MockProvider::new();
        second.expect_name().return_const("second");
        second
            .expect_fetch()
            .returning(|_| Err(MetadataError::MissingTitle));

        let resolver = MetadataResolver::new(vec![Box::new(first), Box::new(second)]);
        let err = resolver.resolve("AAAAAAAAAAA").await.unwrap_err();
        match err {
            MetadataError::Exhausted(detail) => assert!(detail.contains("second")),
            other => panic!("expected Exhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolver_with_no_providers_fails() {
        let resolver = MetadataResolver::new(Vec::new());
        assert!(matches!(
            resolver.resolve("AAAAAAAAAAA").await,
            Err(MetadataError::Exhausted(_))
        ));
    }
}
