use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use video_catalog::config::{
    AppConfig, Config, CorsConfig, EmbeddingConfig, IngestionConfig, MetadataConfig, SearchConfig,
    StoreConfig,
};
use video_catalog::handlers;
use video_catalog::services::ingestion::PLACEHOLDER_TITLE;
use video_catalog::services::metadata::MetadataError;
use video_catalog::services::{
    CatalogService, Embedder, EngagementService, HashingEmbedder, IngestionService,
    MetadataProvider, MetadataResolver, SearchService, VideoMetadata,
};
use video_catalog::store::{DocumentStore, InMemoryStore, VIDEOS_COLLECTION};

const IDENTITY_HEADER: &str = "X-User-Id";

struct StubProvider;

#[async_trait]
impl MetadataProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn fetch(&self, platform_id: &str) -> Result<VideoMetadata, MetadataError> {
        Ok(VideoMetadata {
            title: format!("Stub Title {}", platform_id),
            description: Some("A sample clip served by the stub provider".to_string()),
            thumbnail_url: Some(format!("https://img.example.com/{}.jpg", platform_id)),
            tags: vec!["rust".to_string(), "tutorial".to_string()],
        })
    }
}

/// Fails the first `n` fetches, then answers like a healthy provider.
struct FlakyProvider {
    failures_left: AtomicU32,
}

impl FlakyProvider {
    fn failing(times: u32) -> Self {
        FlakyProvider {
            failures_left: AtomicU32::new(times),
        }
    }
}

#[async_trait]
impl MetadataProvider for FlakyProvider {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn fetch(&self, platform_id: &str) -> Result<VideoMetadata, MetadataError> {
        if self.failures_left.load(Ordering::SeqCst) > 0 {
            self.failures_left.fetch_sub(1, Ordering::SeqCst);
            return Err(MetadataError::Status { status: 503 });
        }
        Ok(VideoMetadata {
            title: format!("Recovered Title {}", platform_id),
            description: None,
            thumbnail_url: None,
            tags: vec!["recovered".to_string()],
        })
    }
}

fn inline_ingestion() -> IngestionConfig {
    IngestionConfig {
        inline_metadata: true,
        background_processing: false,
        processing_delay_ms: 0,
    }
}

fn background_ingestion() -> IngestionConfig {
    IngestionConfig {
        inline_metadata: true,
        background_processing: true,
        processing_delay_ms: 0,
    }
}

fn test_config(ingestion: IngestionConfig, semantic_enabled: bool) -> Config {
    Config {
        app: AppConfig {
            env: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        cors: CorsConfig {
            allowed_origins: "*".to_string(),
        },
        store: StoreConfig {
            endpoint: String::new(),
            token: String::new(),
            keyspace: "video_catalog".to_string(),
            request_timeout_ms: 1_000,
            table_shape: false,
        },
        metadata: MetadataConfig {
            api_key: None,
            request_timeout_ms: 1_000,
        },
        embedding: EmbeddingConfig {
            provider: "hash".to_string(),
            endpoint: String::new(),
            model: String::new(),
            api_key: None,
            dimension: 64,
        },
        ingestion,
        search: SearchConfig {
            semantic_enabled,
            overfetch_factor: 3,
            similarity_threshold: 0.0,
            default_page_size: 10,
            max_page_size: 50,
        },
    }
}

struct Harness {
    store: Arc<InMemoryStore>,
    config: web::Data<Config>,
    ingestion: web::Data<IngestionService>,
    catalog: web::Data<CatalogService>,
    engagement: web::Data<EngagementService>,
    search: web::Data<SearchService>,
}

impl Harness {
    fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.config.clone())
            .app_data(self.ingestion.clone())
            .app_data(self.catalog.clone())
            .app_data(self.engagement.clone())
            .app_data(self.search.clone())
            .service(api_routes());
    }
}

fn build_harness(
    provider: Box<dyn MetadataProvider>,
    ingestion_config: IngestionConfig,
    semantic_enabled: bool,
) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let store_dyn: Arc<dyn DocumentStore> = store.clone();
    let resolver = Arc::new(MetadataResolver::new(vec![provider]));
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(64));
    let config = test_config(ingestion_config.clone(), semantic_enabled);

    let ingestion = IngestionService::new(
        store_dyn.clone(),
        resolver,
        embedder.clone(),
        ingestion_config,
    );
    let catalog = CatalogService::new(store_dyn.clone());
    let engagement = EngagementService::new(store_dyn.clone());
    let search = SearchService::new(store_dyn, embedder, config.search.clone());

    Harness {
        store,
        config: web::Data::new(config),
        ingestion: web::Data::new(ingestion),
        catalog: web::Data::new(catalog),
        engagement: web::Data::new(engagement),
        search: web::Data::new(search),
    }
}

fn stub_harness() -> Harness {
    build_harness(Box::new(StubProvider), inline_ingestion(), true)
}

/// The same route tree `main.rs` mounts, minus the health endpoints.
fn api_routes() -> actix_web::Scope {
    web::scope("/api/v1")
        .service(
            web::scope("/videos")
                .service(web::resource("").route(web::post().to(handlers::submit_video)))
                .route("/latest", web::get().to(handlers::get_latest_videos))
                .route("/trending", web::get().to(handlers::get_trending_videos))
                .route("/preview", web::post().to(handlers::preview_video))
                .route("/by-tag/{tag}", web::get().to(handlers::get_videos_by_tag))
                .route(
                    "/by-uploader/{uploader_id}",
                    web::get().to(handlers::get_videos_by_uploader),
                )
                .service(
                    web::resource("/{video_id}")
                        .route(web::get().to(handlers::get_video_details))
                        .route(web::patch().to(handlers::update_video)),
                )
                .route(
                    "/{video_id}/status",
                    web::get().to(handlers::get_video_status),
                )
                .route("/{video_id}/view", web::post().to(handlers::record_view))
                .service(
                    web::resource("/{video_id}/rating")
                        .route(web::post().to(handlers::rate_video))
                        .route(web::get().to(handlers::get_rating_summary)),
                )
                .route(
                    "/{video_id}/related",
                    web::get().to(handlers::get_related_videos),
                ),
        )
        .service(
            web::scope("/search")
                .route("/videos", web::get().to(handlers::search_videos))
                .route("/tags/suggest", web::get().to(handlers::suggest_tags)),
        )
}

/// Minimal stored document in the persisted camelCase shape. `status`
/// is optional so tests can seed legacy records without one.
fn seeded_doc(video_id: Uuid, name: &str, status: Option<&str>) -> Value {
    let now = chrono::Utc::now();
    let mut doc = json!({
        "videoId": video_id,
        "ownerId": Uuid::new_v4(),
        "name": name,
        "sourceLocation": "https://youtu.be/ZZZZZZZZZZZ",
        "sourcePlatformId": "ZZZZZZZZZZZ",
        "submittedAt": now,
        "lastUpdatedAt": now,
    });
    if let Some(status) = status {
        doc["status"] = json!(status);
    }
    doc
}

#[actix_web::test]
async fn submit_video_returns_accepted_with_resolved_metadata() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;
    let owner = Uuid::new_v4();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/videos")
            .insert_header((IDENTITY_HEADER, owner.to_string()))
            .set_json(json!({"sourceUrl": "https://youtu.be/AAAAAAAAAAA"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "Stub Title AAAAAAAAAAA");
    assert_eq!(body["status"], "READY");
    assert_eq!(body["ownerId"], json!(owner));
    assert_eq!(body["sourcePlatformId"], "AAAAAAAAAAA");
    assert_eq!(body["viewCount"], 0);
    assert_eq!(body["averageRating"], Value::Null);
    assert!(body.get("embedding").is_none());

    assert_eq!(harness.store.len(VIDEOS_COLLECTION).await, 1);
}

#[actix_web::test]
async fn submit_video_keeps_caller_title() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/videos")
            .insert_header((IDENTITY_HEADER, Uuid::new_v4().to_string()))
            .set_json(json!({
                "sourceUrl": "https://youtu.be/AAAAAAAAAAA",
                "title": "My Conference Talk"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "My Conference Talk");
    assert_eq!(body["status"], "READY");
}

#[actix_web::test]
async fn submit_video_rejects_bad_source_urls() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;
    let owner = Uuid::new_v4().to_string();

    // Blank URL never reaches the ingestion service.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/videos")
            .insert_header((IDENTITY_HEADER, owner.clone()))
            .set_json(json!({"sourceUrl": ""}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Well-formed URL on an unsupported host.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/videos")
            .insert_header((IDENTITY_HEADER, owner))
            .set_json(json!({"sourceUrl": "https://example.com/videos/123"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], 400);
    assert!(body["error"].is_string());

    assert_eq!(harness.store.len(VIDEOS_COLLECTION).await, 0);
}

#[actix_web::test]
async fn submit_video_requires_identity_header() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/videos")
            .set_json(json!({"sourceUrl": "https://youtu.be/AAAAAAAAAAA"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn deferred_submission_recovers_on_reprocess() {
    let harness = build_harness(
        Box::new(FlakyProvider::failing(1)),
        inline_ingestion(),
        true,
    );
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/videos")
            .insert_header((IDENTITY_HEADER, Uuid::new_v4().to_string()))
            .set_json(json!({"sourceUrl": "https://youtu.be/AAAAAAAAAAA"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["name"], PLACEHOLDER_TITLE);
    let video_id = Uuid::parse_str(body["videoId"].as_str().unwrap()).unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/videos/{}/status", video_id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let status_body: Value = test::read_body_json(resp).await;
    assert_eq!(status_body["videoId"], json!(video_id));
    assert_eq!(status_body["status"], "PENDING");

    // The provider has healed; a follow-up pass upgrades the record.
    harness
        .ingestion
        .process_submission(video_id, "AAAAAAAAAAA")
        .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/videos/{}", video_id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "READY");
    assert_eq!(body["name"], "Recovered Title AAAAAAAAAAA");
    assert_eq!(body["tags"], json!(["recovered"]));
}

#[actix_web::test]
async fn background_processing_completes_detached() {
    let harness = build_harness(
        Box::new(FlakyProvider::failing(1)),
        background_ingestion(),
        true,
    );
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/videos")
            .insert_header((IDENTITY_HEADER, Uuid::new_v4().to_string()))
            .set_json(json!({"sourceUrl": "https://youtu.be/AAAAAAAAAAA"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "PENDING");
    let video_id = body["videoId"].as_str().unwrap().to_string();

    let mut status = String::new();
    for _ in 0..50 {
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/v1/videos/{}/status", video_id))
                .to_request(),
        )
        .await;
        let body: Value = test::read_body_json(resp).await;
        status = body["status"].as_str().unwrap_or_default().to_string();
        if status == "READY" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(status, "READY");
}

#[actix_web::test]
async fn video_detail_lookup_unknown_returns_404() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/videos/{}", Uuid::new_v4()))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], 404);
}

#[actix_web::test]
async fn update_video_edits_descriptive_fields() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;
    let record = harness
        .ingestion
        .submit("https://youtu.be/AAAAAAAAAAA", None, Uuid::new_v4())
        .await
        .unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri(&format!("/api/v1/videos/{}", record.video_id))
            .set_json(json!({"name": "Renamed Talk", "tags": ["edited"]}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "Renamed Talk");
    assert_eq!(body["tags"], json!(["edited"]));

    // The edit is persisted, not just echoed.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/videos/{}", record.video_id))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "Renamed Talk");
    assert_eq!(body["description"], "A sample clip served by the stub provider");

    // Names shorter than three characters fail validation.
    let resp = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri(&format!("/api/v1/videos/{}", record.video_id))
            .set_json(json!({"name": "ab"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn view_recording_gates_on_lifecycle_state() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;
    let ready = harness
        .ingestion
        .submit("https://youtu.be/AAAAAAAAAAA", None, Uuid::new_v4())
        .await
        .unwrap();

    for _ in 0..2 {
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/v1/videos/{}/view", ready.video_id))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/videos/{}", ready.video_id))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["viewCount"], 2);

    // Undelivered records are not viewable.
    let pending_id = Uuid::new_v4();
    harness
        .store
        .insert_one(
            VIDEOS_COLLECTION,
            seeded_doc(pending_id, "Still Pending", Some("PENDING")),
        )
        .await
        .unwrap();
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/videos/{}/view", pending_id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Records stored without a status count as READY.
    let legacy_id = Uuid::new_v4();
    harness
        .store
        .insert_one(VIDEOS_COLLECTION, seeded_doc(legacy_id, "Legacy", None))
        .await
        .unwrap();
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/videos/{}/view", legacy_id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/videos/{}/view", Uuid::new_v4()))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn rating_flow_upserts_and_averages() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;
    let record = harness
        .ingestion
        .submit("https://youtu.be/AAAAAAAAAAA", None, Uuid::new_v4())
        .await
        .unwrap();
    let rating_uri = format!("/api/v1/videos/{}/rating", record.video_id);
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&rating_uri)
            .insert_header((IDENTITY_HEADER, alice.to_string()))
            .set_json(json!({"rating": 4}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&rating_uri)
            .insert_header((IDENTITY_HEADER, bob.to_string()))
            .set_json(json!({"rating": 2}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri(&rating_uri).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ratingCount"], 2);
    assert_eq!(body["ratingTotal"], 6);
    assert_eq!(body["average"], 3.0);

    // Re-rating replaces the caller's previous value.
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&rating_uri)
            .insert_header((IDENTITY_HEADER, alice.to_string()))
            .set_json(json!({"rating": 5}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri(&rating_uri).to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ratingCount"], 2);
    assert_eq!(body["ratingTotal"], 7);
    assert_eq!(body["average"], 3.5);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&rating_uri)
            .insert_header((IDENTITY_HEADER, alice.to_string()))
            .set_json(json!({"rating": 6}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&rating_uri)
            .set_json(json!({"rating": 3}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/videos/{}/rating", Uuid::new_v4()))
            .insert_header((IDENTITY_HEADER, alice.to_string()))
            .set_json(json!({"rating": 3}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn latest_listing_paginates_ready_records() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;
    let owner = Uuid::new_v4();
    let mut submitted = Vec::new();
    for key in ["AAAAAAAAAAA", "BBBBBBBBBBB", "CCCCCCCCCCC"] {
        let record = harness
            .ingestion
            .submit(&format!("https://youtu.be/{}", key), None, owner)
            .await
            .unwrap();
        submitted.push(record.video_id.to_string());
    }
    // A record still in flight stays out of the listing.
    harness
        .store
        .insert_one(
            VIDEOS_COLLECTION,
            seeded_doc(Uuid::new_v4(), "In Flight", Some("PENDING")),
        )
        .await
        .unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/videos/latest?page=1&pageSize=2")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["currentPage"], 1);
    assert_eq!(body["pagination"]["pageSize"], 2);
    assert_eq!(body["pagination"]["totalItems"], 3);
    assert_eq!(body["pagination"]["totalPages"], 2);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/videos/latest?page=2&pageSize=2")
            .to_request(),
    )
    .await;
    let second: Value = test::read_body_json(resp).await;
    assert_eq!(second["data"].as_array().unwrap().len(), 1);

    // Two pages together cover every delivered record exactly once.
    let mut seen: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .chain(second["data"].as_array().unwrap().iter())
        .map(|item| item["videoId"].as_str().unwrap().to_string())
        .collect();
    seen.sort();
    submitted.sort();
    assert_eq!(seen, submitted);
}

#[actix_web::test]
async fn scoped_listings_filter_by_tag_and_uploader() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    harness
        .ingestion
        .submit("https://youtu.be/AAAAAAAAAAA", None, alice)
        .await
        .unwrap();
    harness
        .ingestion
        .submit("https://youtu.be/BBBBBBBBBBB", None, bob)
        .await
        .unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/videos/by-tag/rust")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["totalItems"], 2);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/videos/by-tag/cooking")
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["totalItems"], 0);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/videos/by-uploader/{}", alice))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["totalItems"], 1);
    assert_eq!(body["data"][0]["ownerId"], json!(alice));
}

#[actix_web::test]
async fn search_returns_envelope_and_validates_query() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;
    let owner = Uuid::new_v4();
    for key in ["AAAAAAAAAAA", "BBBBBBBBBBB"] {
        harness
            .ingestion
            .submit(&format!("https://youtu.be/{}", key), None, owner)
            .await
            .unwrap();
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/search/videos?query=stub+tutorial")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["totalItems"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert!(body["data"][0]["name"].is_string());

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/search/videos?query=")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // One token over the embedding budget.
    let long_query = vec!["word"; 513].join("+");
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/search/videos?query={}", long_query))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("512"));
}

#[actix_web::test]
async fn search_keyword_mode_matches_substrings() {
    let harness = build_harness(Box::new(StubProvider), inline_ingestion(), false);
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;
    let owner = Uuid::new_v4();
    for key in ["AAAAAAAAAAA", "BBBBBBBBBBB"] {
        harness
            .ingestion
            .submit(&format!("https://youtu.be/{}", key), None, owner)
            .await
            .unwrap();
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/search/videos?query=Stub+Title")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["totalItems"], 2);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/search/videos?query=zebra")
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"]["totalItems"], 0);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn tag_suggestions_filter_by_substring() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;
    harness
        .ingestion
        .submit("https://youtu.be/AAAAAAAAAAA", None, Uuid::new_v4())
        .await
        .unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/search/tags/suggest?query=rus")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!([{"tag": "rust"}]));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/search/tags/suggest?query=zzz")
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!([]));

    // Out-of-range limits are clamped, not rejected.
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/search/tags/suggest?query=t&limit=0")
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn trending_ranks_by_recent_views() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;
    let owner = Uuid::new_v4();
    let first = harness
        .ingestion
        .submit("https://youtu.be/AAAAAAAAAAA", None, owner)
        .await
        .unwrap();
    let second = harness
        .ingestion
        .submit("https://youtu.be/BBBBBBBBBBB", None, owner)
        .await
        .unwrap();

    for (video_id, views) in [(first.video_id, 2), (second.video_id, 1)] {
        for _ in 0..views {
            let resp = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri(&format!("/api/v1/videos/{}/view", video_id))
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        }
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/videos/trending?intervalDays=1&limit=10")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["videoId"], json!(first.video_id));
    assert_eq!(items[0]["recentViews"], 2);
    assert_eq!(items[1]["videoId"], json!(second.video_id));
    assert_eq!(items[1]["recentViews"], 1);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/videos/trending?limit=1")
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn related_videos_exclude_the_source() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;
    let owner = Uuid::new_v4();
    let mut ids = Vec::new();
    for key in ["AAAAAAAAAAA", "BBBBBBBBBBB", "CCCCCCCCCCC"] {
        let record = harness
            .ingestion
            .submit(&format!("https://youtu.be/{}", key), None, owner)
            .await
            .unwrap();
        ids.push(record.video_id);
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/videos/{}/related", ids[0]))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    for item in items {
        assert_ne!(item["videoId"], json!(ids[0]));
        assert!(item["score"].as_f64().is_some());
    }

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/videos/{}/related", Uuid::new_v4()))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn preview_resolves_title_without_persisting() {
    let harness = stub_harness();
    let app = test::init_service(App::new().configure(|cfg| harness.register(cfg))).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/videos/preview")
            .set_json(json!({"sourceUrl": "https://youtu.be/AAAAAAAAAAA"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"title": "Stub Title AAAAAAAAAAA"}));
    assert_eq!(harness.store.len(VIDEOS_COLLECTION).await, 0);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/videos/preview")
            .set_json(json!({"sourceUrl": "https://example.com/clip"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
