//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for the Storefront API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = "E-commerce REST API: accounts, catalog, orders, reviews and media",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    nest(
        (path = "/api", api = domain_users::handlers::ApiDoc),
        (path = "/api", api = domain_catalog::handlers::ApiDoc),
        (path = "/api", api = domain_orders::handlers::ApiDoc),
        (path = "/api/reviews", api = domain_reviews::handlers::ApiDoc),
        (path = "/api/media", api = domain_media::handlers::ApiDoc),
    )
)]
pub struct ApiDoc;
