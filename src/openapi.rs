/// OpenAPI documentation for the Nova Video Catalog Service
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Nova Video Catalog Service API",
        version = "0.1.0",
        description = "Video submission, ingestion lifecycle, semantic search, and engagement aggregation",
        contact(
            name = "Nova Team",
            email = "support@nova.app"
        ),
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8085", description = "Development server"),
        (url = "https://api.nova.app/videos", description = "Production server"),
    ),
    tags(
        (name = "Health", description = "Service health checks"),
        (name = "Videos", description = "Submission, lifecycle, updates, and engagement"),
        (name = "Search", description = "Video search and tag suggestions"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn title() -> &'static str {
        "Nova Video Catalog Service"
    }

    pub fn version() -> &'static str {
        "0.1.0"
    }

    pub fn openapi_json_path() -> &'static str {
        "/openapi.json"
    }
}
