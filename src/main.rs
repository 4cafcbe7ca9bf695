use anyhow::{Context, Result};
use plant_monitor::common::db;
use plant_monitor::config::Config;
use plant_monitor::external::s3::S3Storage;
use plant_monitor::routes;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env().context("Invalid configuration")?;

    let db = db::connect(&config, 5)
        .await
        .context("Could not open the operational store")?;
    tracing::info!("Connected to the database (schema {})", config.db_schema);

    let storage = Arc::new(S3Storage::from_config(&config).await);
    let router = routes::build_router(&db, &config, storage);

    let listener = tokio::net::TcpListener::bind(&config.dashboard_addr)
        .await
        .with_context(|| format!("Could not bind {}", config.dashboard_addr))?;
    tracing::info!(
        "Starting {} dashboard on {}",
        config.app_name,
        listener.local_addr()?
    );

    axum::serve(listener, router.into_make_service())
        .await
        .context("Dashboard server stopped")?;

    db::close(db).await;
    Ok(())
}
