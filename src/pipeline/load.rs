//! Loading of cleaned readings into the operational store.
//!
//! Three phases, each in its own transaction: botanists, then plants, then
//! recordings. The first two are insert-if-absent and can be replayed
//! safely; recordings are always appended.

use super::models::CleanReading;
use crate::botanists::models::{self as botanists, BotanistKey};
use crate::common::errors::{DbErrorExt, PipelineError};
use crate::plants::models as plants;
use crate::recordings::models as recordings;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    NotSet, QueryFilter, Set, TransactionTrait,
};
use std::collections::{HashMap, HashSet};

const BOTANIST_STAGE: &str = "botanist upsert";
const PLANT_STAGE: &str = "plant upsert";
const RECORDING_STAGE: &str = "recording insert";

/// Rows per multi-row INSERT for recordings
const RECORDING_CHUNK_SIZE: usize = 500;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub botanists_inserted: usize,
    pub plants_inserted: usize,
    pub recordings_inserted: usize,
}

/// Run all three phases. An empty batch touches nothing.
///
/// # Errors
///
/// Returns `PipelineError::Database` for the first failing phase. That
/// phase is rolled back; phases committed before it stay committed.
pub async fn load_readings(
    db: &DatabaseConnection,
    readings: &[CleanReading],
) -> Result<LoadSummary, PipelineError> {
    if readings.is_empty() {
        tracing::warn!("No cleaned readings to load");
        return Ok(LoadSummary::default());
    }

    let (botanists_inserted, plants_inserted) = load_reference_data(db, readings).await?;

    tracing::info!("Inserting recordings into the database...");
    let txn = begin(db, RECORDING_STAGE).await?;
    let result = insert_recordings(&txn, readings).await;
    let recordings_inserted = commit_or_rollback(txn, RECORDING_STAGE, result).await?;
    tracing::info!("Inserted {recordings_inserted} recordings");

    Ok(LoadSummary {
        botanists_inserted,
        plants_inserted,
        recordings_inserted,
    })
}

/// Botanist and plant phases only; used by the seeder as well.
///
/// # Errors
///
/// Returns `PipelineError::Database` if either phase fails.
pub async fn load_reference_data(
    db: &DatabaseConnection,
    readings: &[CleanReading],
) -> Result<(usize, usize), PipelineError> {
    tracing::info!("Inserting botanists into the database...");
    let txn = begin(db, BOTANIST_STAGE).await?;
    let result = insert_botanists(&txn, readings).await;
    let botanists_inserted = commit_or_rollback(txn, BOTANIST_STAGE, result).await?;
    tracing::info!("Inserted {botanists_inserted} new botanists");

    tracing::info!("Inserting plants into the database...");
    let txn = begin(db, PLANT_STAGE).await?;
    let result = insert_plants(&txn, readings).await;
    let plants_inserted = commit_or_rollback(txn, PLANT_STAGE, result).await?;
    tracing::info!("Inserted {plants_inserted} new plants");

    Ok((botanists_inserted, plants_inserted))
}

/// Insert every botanist whose natural key is not stored yet
pub async fn insert_botanists<C: ConnectionTrait>(
    conn: &C,
    readings: &[CleanReading],
) -> Result<usize, DbErr> {
    let mut known: HashSet<BotanistKey> = botanists::Entity::find()
        .all(conn)
        .await?
        .iter()
        .map(BotanistKey::from)
        .collect();

    let mut inserted = 0;
    for reading in readings {
        let key = reading.botanist_key();
        if known.contains(&key) {
            continue;
        }

        botanists::Entity::insert(botanists::ActiveModel {
            botanist_id: NotSet,
            first_name: Set(key.first_name.clone()),
            last_name: Set(key.last_name.clone()),
            email: Set(key.email.clone()),
            phone: Set(key.phone.clone()),
        })
        .exec(conn)
        .await?;

        known.insert(key);
        inserted += 1;
    }

    Ok(inserted)
}

/// Insert every plant id not stored yet, pointing it at its botanist
pub async fn insert_plants<C: ConnectionTrait>(
    conn: &C,
    readings: &[CleanReading],
) -> Result<usize, DbErr> {
    let botanist_ids: HashMap<BotanistKey, i32> = botanists::Entity::find()
        .all(conn)
        .await?
        .iter()
        .map(|botanist| (BotanistKey::from(botanist), botanist.botanist_id))
        .collect();

    let batch_ids: HashSet<i32> = readings.iter().map(|r| r.plant_id).collect();
    let mut known: HashSet<i32> = plants::Entity::find()
        .filter(plants::Column::PlantId.is_in(batch_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|plant| plant.plant_id)
        .collect();

    let mut inserted = 0;
    for reading in readings {
        if known.contains(&reading.plant_id) {
            continue;
        }

        let botanist_id = *botanist_ids.get(&reading.botanist_key()).ok_or_else(|| {
            DbErr::RecordNotFound(format!(
                "No botanist matches plant {} ({} {})",
                reading.plant_id, reading.botanist_first_name, reading.botanist_last_name
            ))
        })?;

        plants::Entity::insert(plants::ActiveModel {
            plant_id: Set(reading.plant_id),
            botanist_id: Set(botanist_id),
            plant_name: Set(reading.plant_name.clone()),
        })
        .exec(conn)
        .await?;

        known.insert(reading.plant_id);
        inserted += 1;
    }

    Ok(inserted)
}

/// Append one recording per reading, duplicates included
pub async fn insert_recordings<C: ConnectionTrait>(
    conn: &C,
    readings: &[CleanReading],
) -> Result<usize, DbErr> {
    for chunk in readings.chunks(RECORDING_CHUNK_SIZE) {
        let models = chunk.iter().map(|reading| recordings::ActiveModel {
            recording_id: NotSet,
            plant_id: Set(reading.plant_id),
            soil_moisture: Set(reading.soil_moisture),
            temperature: Set(reading.temperature),
            last_watered: Set(reading.last_watered),
            recording_at: Set(reading.recording_at),
        });
        recordings::Entity::insert_many(models).exec(conn).await?;
    }

    Ok(readings.len())
}

async fn begin(db: &DatabaseConnection, stage: &str) -> Result<DatabaseTransaction, PipelineError> {
    db.begin().await.map_err(|e| {
        tracing::error!("Could not start {stage} transaction: {e}");
        e.to_pipeline_error(stage)
    })
}

async fn commit_or_rollback<T>(
    txn: DatabaseTransaction,
    stage: &str,
    result: Result<T, DbErr>,
) -> Result<T, PipelineError> {
    match result {
        Ok(value) => {
            txn.commit().await.map_err(|e| {
                tracing::error!("Commit of {stage} failed: {e}");
                e.to_pipeline_error(stage)
            })?;
            Ok(value)
        }
        Err(e) => {
            tracing::error!("Error occurred during {stage}, rolling back: {e}");
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!("Rollback of {stage} failed: {rollback_err}");
            }
            Err(e.to_pipeline_error(stage))
        }
    }
}
