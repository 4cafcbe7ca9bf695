//! Move today's recordings into cold storage as a Parquet snapshot.

use anyhow::{Context, Result};
use chrono::Utc;
use plant_monitor::archive::run_archive;
use plant_monitor::common::db;
use plant_monitor::config::Config;
use plant_monitor::external::s3::S3Storage;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env().context("Invalid configuration")?;
    let storage = S3Storage::from_config(&config).await;

    let conn = db::connect(&config, 1)
        .await
        .context("Could not open the operational store")?;
    let result = run_archive(
        &conn,
        &storage,
        &config.s3_key_prefix,
        Utc::now().date_naive(),
    )
    .await;
    db::close(conn).await;

    let summary = result.context("Archival failed")?;
    match summary.object_key {
        Some(key) => tracing::info!("Archived {} rows to {key}", summary.rows_archived),
        None => tracing::info!("Nothing to archive"),
    }
    Ok(())
}
