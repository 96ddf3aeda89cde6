use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tubely::app::create_app;
use tubely::config::settings::AppConfig;
use tubely::infrastructure::db::pool::{connect_to_db, run_migrations};
use tubely::infrastructure::storage::s3::StorageService;
use tubely::modules::video::repository::PgVideoRepository;
use tubely::state::AppState;
use tubely::workers::janitor::start_staging_janitor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    info!("Starting server...");

    let config = AppConfig::new().context("missing required environment variable")?;

    let pool = connect_to_db(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;
    run_migrations(&pool).await.context("failed to run migrations")?;

    let storage = Arc::new(StorageService::new(&config));
    let videos = Arc::new(PgVideoRepository::new(pool));

    tokio::fs::create_dir_all(config.staging_dir())
        .await
        .with_context(|| format!("failed to create {}", config.staging_dir().display()))?;
    info!("✅ Staging directory ready at {}", config.staging_dir().display());

    start_staging_janitor(config.staging_dir(), config.janitor_interval(), config.staging_grace());

    let state = AppState::new(config.clone(), videos, storage);
    let app = create_app(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("🚀 Server running on http://{}", addr);
    info!("📚 Swagger UI at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
