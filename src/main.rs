use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use std::io;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use video_catalog::handlers;
use video_catalog::jobs::start_embedding_backfill;
use video_catalog::openapi::ApiDoc;
use video_catalog::services::{
    embedder_from_config, CatalogService, EngagementService, IngestionService, MetadataResolver,
    SearchService,
};
use video_catalog::store::{store_from_config, DocumentStore, Filter, Sort, VIDEOS_COLLECTION};
use video_catalog::Config;

async fn health_summary(store: web::Data<Arc<dyn DocumentStore>>) -> HttpResponse {
    match store
        .find_page(VIDEOS_COLLECTION, Filter::new(), Sort::Unsorted, 0, 1)
        .await
    {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "video-catalog",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("store probe failed: {}", e),
            "service": "video-catalog"
        })),
    }
}

async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

async fn openapi_json(doc: web::Data<utoipa::openapi::OpenApi>) -> actix_web::Result<HttpResponse> {
    let body = serde_json::to_string(&*doc).map_err(|e| {
        tracing::error!("OpenAPI serialization failed: {}", e);
        actix_web::error::ErrorInternalServerError("OpenAPI serialization error")
    })?;

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

/// Video Catalog Service
///
/// A microservice that ingests externally hosted videos into a catalog,
/// resolves their metadata, embeds them for semantic discovery, and
/// aggregates playback and rating engagement.
///
/// # Routes
///
/// - `POST /api/v1/videos` - Submit a source URL (202, async follow-up)
/// - `GET/PATCH /api/v1/videos/{id}` - Detail read and field updates
/// - `GET /api/v1/videos/{id}/status` - Lifecycle status polling
/// - `POST /api/v1/videos/{id}/view` - Record a playback view
/// - `POST/GET /api/v1/videos/{id}/rating` - Submit / read ratings
/// - `GET /api/v1/videos/{id}/related` - Embedding-nearest videos
/// - `GET /api/v1/videos/latest|trending|by-tag/..|by-uploader/..`
/// - `POST /api/v1/videos/preview` - Title lookup without persistence
/// - `GET /api/v1/search/videos` - Ranked video search
/// - `GET /api/v1/search/tags/suggest` - Tag autocomplete
///
/// # Deployment
///
/// Listens on VIDEO_CATALOG_HOST:VIDEO_CATALOG_PORT (default
/// 0.0.0.0:8085). With no STORE_ENDPOINT configured the service runs on
/// the in-memory store backend. Swagger UI is mounted outside
/// production environments.
#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting video-catalog v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let store = store_from_config(&config.store)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("store init failed: {}", e)))?;
    let resolver = Arc::new(MetadataResolver::from_config(&config.metadata).map_err(|e| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("metadata resolver init failed: {}", e),
        )
    })?);
    let embedder = embedder_from_config(&config.embedding).map_err(|e| {
        io::Error::new(io::ErrorKind::Other, format!("embedder init failed: {}", e))
    })?;

    let ingestion = web::Data::new(IngestionService::new(
        store.clone(),
        resolver.clone(),
        embedder.clone(),
        config.ingestion.clone(),
    ));
    let catalog = web::Data::new(CatalogService::new(store.clone()));
    let engagement = web::Data::new(EngagementService::new(store.clone()));
    let search = web::Data::new(SearchService::new(
        store.clone(),
        embedder.clone(),
        config.search.clone(),
    ));
    let store_data = web::Data::new(store.clone());
    let config_data = web::Data::new(config.clone());

    // Repairs records whose embedding was never written
    tokio::spawn(start_embedding_backfill(store.clone(), embedder.clone()));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let enable_swagger = !config.is_production();

    let server = HttpServer::new(move || {
        // Build CORS configuration
        let mut cors = Cors::default();
        for origin in config.cors.allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        let openapi_doc = ApiDoc::openapi();

        let app = App::new()
            .app_data(web::Data::new(openapi_doc.clone()))
            .app_data(config_data.clone())
            .app_data(store_data.clone())
            .app_data(ingestion.clone())
            .app_data(catalog.clone())
            .app_data(engagement.clone())
            .app_data(search.clone());

        let app = if enable_swagger {
            app.service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api/v1/openapi.json", openapi_doc),
            )
            .route("/api/v1/openapi.json", web::get().to(openapi_json))
        } else {
            app
        };

        app.wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            // Health check endpoints
            .route("/health", web::get().to(health_summary))
            .route("/api/v1/health", web::get().to(health_summary))
            .route("/api/v1/health/live", web::get().to(liveness_check))
            .service(
                web::scope("/api/v1")
                    .service(
                        web::scope("/videos")
                            .service(
                                web::resource("")
                                    .route(web::post().to(handlers::submit_video)),
                            )
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
                    ),
            )
    })
    .bind(&bind_address)?
    .workers(4)
    .run();

    tracing::info!("HTTP server listening on {}", bind_address);
    server.await
}
