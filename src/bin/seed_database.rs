//! Plant Monitor Database Seeder
//!
//! Populates the botanist and plant tables from the plants API before the
//! first scheduled pipeline run. No recordings are written, so the first
//! archive snapshot only contains readings the pipeline itself collected.
//!
//! Usage:
//!   `cargo run --bin seed_database`
//!
//! Configuration comes from the same environment variables as the pipeline.

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use plant_monitor::common::db;
use plant_monitor::config::Config;
use plant_monitor::pipeline::extract::{PlantsApiClient, parse_plant};
use plant_monitor::pipeline::load::load_reference_data;
use plant_monitor::pipeline::models::RawReading;
use plant_monitor::pipeline::transform::clean_readings;

struct DatabaseSeeder {
    config: Config,
    client: PlantsApiClient,
}

impl DatabaseSeeder {
    fn new(config: Config) -> Result<Self> {
        let client = PlantsApiClient::new(&config.plants_api_url, config.api_timeout())?;
        Ok(Self { config, client })
    }

    async fn fetch_plants(&self) -> Result<Vec<RawReading>> {
        println!(
            "{} Fetching plants from the API...",
            style("[1/3]").bold().dim()
        );

        let ids = self.config.plant_ids();
        let total = u64::try_from(ids.clone().count()).unwrap_or_default();
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} {msg}",
                )
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );

        let mut readings = Vec::new();
        let mut skipped = 0;
        for plant_id in ids {
            pb.set_message(format!("plant {plant_id}"));
            match self.client.fetch_plant(plant_id).await {
                Some(plant) => readings.push(parse_plant(plant, plant_id)),
                None => skipped += 1,
            }
            pb.inc(1);
        }
        pb.finish_with_message("done");

        println!(
            "{} Fetched {} plants ({} unavailable)",
            style("✔").green(),
            style(readings.len()).bold(),
            skipped
        );
        Ok(readings)
    }

    async fn seed_database(&self) -> Result<()> {
        let raw = self.fetch_plants().await?;

        println!("{} Cleaning records...", style("[2/3]").bold().dim());
        let cleaned = clean_readings(&raw);
        if cleaned.len() < raw.len() {
            println!(
                "{} {} records failed validation and were left out",
                style("⚠").yellow(),
                raw.len() - cleaned.len()
            );
        }

        println!(
            "{} Inserting botanists and plants...",
            style("[3/3]").bold().dim()
        );
        let conn = db::connect(&self.config, 1)
            .await
            .context("Could not open the operational store")?;
        let result = load_reference_data(&conn, &cleaned).await;
        db::close(conn).await;
        let (botanists, plants) = result.context("Seeding failed")?;

        println!();
        println!("{}", style("Seeding complete").bold().green());
        println!("  Botanists inserted: {}", style(botanists).cyan());
        println!("  Plants inserted:    {}", style(plants).cyan());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    println!("{}", style("Plant Monitor Database Seeder").bold());
    println!("{}", style("━".repeat(40)).dim());
    println!("API URL: {}", style(&config.plants_api_url).cyan());
    println!(
        "Plants:  {}..={}",
        config.plant_id_start, config.plant_id_end
    );
    println!("Schema:  {}", style(&config.db_schema).cyan());

    let seeder = DatabaseSeeder::new(config)?;
    seeder.seed_database().await
}
