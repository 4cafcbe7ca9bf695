//! One extract → transform → load run over every configured plant id.
//!
//! Meant to be started by an external scheduler (cron, systemd timer).

use anyhow::{Context, Result};
use plant_monitor::config::Config;
use plant_monitor::pipeline::run_pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env().context("Invalid configuration")?;
    let summary = run_pipeline(&config).await?;

    tracing::info!(
        "Extracted {}, cleaned {}, loaded {} recordings",
        summary.extracted,
        summary.cleaned,
        summary.loaded.recordings_inserted
    );
    Ok(())
}
