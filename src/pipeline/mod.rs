pub mod audit;
pub mod extract;
pub mod load;
pub mod models;
pub mod transform;

use crate::common::db;
use crate::config::Config;
use anyhow::{Context, Result};
use extract::{PlantsApiClient, extract_readings};
use futures::StreamExt;
use load::LoadSummary;
use models::RawReading;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSummary {
    pub extracted: usize,
    pub cleaned: usize,
    pub loaded: LoadSummary,
}

/// One batch run: extract every configured plant, clean, load.
///
/// The source API is polled before the database is opened, and the
/// connection is closed whether or not the load succeeds.
///
/// # Errors
///
/// Fails if the API client cannot be built, an audit file cannot be
/// written, or the database connection or any load phase fails.
pub async fn run_pipeline(config: &Config) -> Result<PipelineSummary> {
    let client = PlantsApiClient::new(&config.plants_api_url, config.api_timeout())?;

    tracing::info!(
        "Extracting plants {}..={} from {}",
        config.plant_id_start,
        config.plant_id_end,
        config.plants_api_url
    );
    let raw: Vec<RawReading> = extract_readings(&client, config.plant_ids())
        .collect()
        .await;
    tracing::info!("Extracted {} readings", raw.len());

    if let Some(dir) = &config.data_dir {
        audit::write_raw_csv(Path::new(dir), &raw).context("Failed to write raw audit file")?;
    }

    let cleaned = transform::clean_readings(&raw);
    tracing::info!("{} readings passed cleaning", cleaned.len());

    if let Some(dir) = &config.data_dir {
        audit::write_cleaned_csv(Path::new(dir), &cleaned)
            .context("Failed to write cleaned audit file")?;
    }

    let conn = db::connect(config, 1)
        .await
        .context("Could not open the operational store")?;
    let loaded = load::load_readings(&conn, &cleaned).await;
    db::close(conn).await;

    let loaded = loaded.context("Loading readings failed")?;
    tracing::info!(
        "Pipeline finished: {} new botanists, {} new plants, {} recordings",
        loaded.botanists_inserted,
        loaded.plants_inserted,
        loaded.recordings_inserted
    );

    Ok(PipelineSummary {
        extracted: raw.len(),
        cleaned: cleaned.len(),
        loaded,
    })
}
