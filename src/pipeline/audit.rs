//! Optional CSV copies of each run's raw and cleaned batches.

use super::models::{CleanReading, RawReading};
use crate::common::errors::PipelineError;
use std::path::{Path, PathBuf};

pub const RAW_FILE_NAME: &str = "plant_data.csv";
pub const CLEANED_FILE_NAME: &str = "cleaned_plant_data.csv";

/// Write the extracted batch as text, missing cells left empty.
///
/// # Errors
///
/// Returns `PipelineError::Io` if the directory or file cannot be written.
pub fn write_raw_csv(dir: &Path, readings: &[RawReading]) -> Result<PathBuf, PipelineError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(RAW_FILE_NAME);

    let mut writer = csv::Writer::from_path(&path).map_err(PipelineError::io)?;
    writer
        .write_record(RawReading::COLUMNS)
        .map_err(PipelineError::io)?;
    for reading in readings {
        writer
            .write_record(reading.to_record())
            .map_err(PipelineError::io)?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} raw readings to {}", readings.len(), path.display());
    Ok(path)
}

/// Write the cleaned batch under the same header as the raw file, even
/// when the batch is empty.
///
/// # Errors
///
/// Returns `PipelineError::Io` if the directory or file cannot be written.
pub fn write_cleaned_csv(
    dir: &Path,
    readings: &[CleanReading],
) -> Result<PathBuf, PipelineError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(CLEANED_FILE_NAME);

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .map_err(PipelineError::io)?;
    writer
        .write_record(RawReading::COLUMNS)
        .map_err(PipelineError::io)?;
    for reading in readings {
        writer.serialize(reading).map_err(PipelineError::io)?;
    }
    writer.flush()?;

    tracing::info!(
        "Wrote {} cleaned readings to {}",
        readings.len(),
        path.display()
    );
    Ok(path)
}
