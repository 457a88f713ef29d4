//! Configuration for the Storefront API

use axum_helpers::JwtConfig;
use core_config::{app_info, env_or_default, server::ServerConfig, AppInfo, FromEnv};
use database::postgres::PostgresConfig;

pub use core_config::Environment;

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub postgres: PostgresConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub environment: Environment,
    /// Base URL of the external payment processor.
    pub payment_gateway_url: String,
    /// Base URL advertised for stored media objects.
    pub media_base_url: String,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let postgres = PostgresConfig::from_env()?;
        let server = ServerConfig::from_env()?;
        let jwt = JwtConfig::from_env()?;

        let payment_gateway_url = env_or_default(
            "PAYMENT_GATEWAY_URL",
            "http://localhost:9090",
        );
        let media_base_url = env_or_default("MEDIA_BASE_URL", "http://localhost:8080/blobs");

        Ok(Self {
            app: app_info!(),
            postgres,
            server,
            jwt,
            environment,
            payment_gateway_url,
            media_base_url,
        })
    }
}
