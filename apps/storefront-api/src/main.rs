//! Storefront API - e-commerce REST server

use std::time::Duration;

use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let db = database::postgres::connect_with_retry(config.postgres.url(), None).await?;

    database::postgres::run_migrations::<migration::Migrator>(&db, config.app.name).await?;

    let state = AppState::new(db, &config);

    let api_routes = api::routes(&state);
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes).await?;
    let app = router.merge(health_router(config.app.clone()));

    info!("Starting Storefront API on port {}", config.server.port);

    create_production_app(app, &config.server, Duration::from_secs(30), async move {
        info!("Shutting down: closing database connection");
        if let Err(e) = state.db.close().await {
            tracing::warn!("Error closing database connection: {e}");
        }
        info!("Database connection closed");
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Storefront API shutdown complete");
    Ok(())
}
