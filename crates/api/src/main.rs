use std::env;

use anyhow::Result;
use skyserve_api::{build_app_with, ApiConfig};
use skyserve_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("skyserve_api");

    let bind = env::var("SKYSERVE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let config = ApiConfig::from_env();
    let storage = if config.database_url.is_some() {
        "sqlite"
    } else {
        "memory"
    };

    let app = build_app_with(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, storage, "skyserve api started");

    axum::serve(listener, app).await?;
    Ok(())
}
