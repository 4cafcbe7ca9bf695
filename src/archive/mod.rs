//! Daily move of the recording table into cold storage.

pub mod snapshot;

use crate::botanists::models as botanists;
use crate::common::errors::{DbErrorExt, PipelineError};
use crate::external::s3::ColdStorage;
use crate::plants::models as plants;
use crate::recordings::models as recordings;
use chrono::NaiveDate;
use sea_orm::{
    DatabaseConnection, EntityTrait, JoinType, QueryOrder, QuerySelect, RelationTrait, Select,
};
use snapshot::{SnapshotRow, snapshot_file_name, write_snapshot_file};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub rows_archived: usize,
    /// `None` when there was nothing to upload
    pub object_key: Option<String>,
}

/// plant ⋈ recording ⋈ botanist, projected onto the snapshot columns.
/// Unordered; callers add the ordering they need.
pub fn joined_readings_query() -> Select<recordings::Entity> {
    recordings::Entity::find()
        .select_only()
        .column_as(plants::Column::PlantId, "plant_id")
        .column_as(plants::Column::PlantName, "plant_name")
        .column(recordings::Column::SoilMoisture)
        .column(recordings::Column::Temperature)
        .column(recordings::Column::LastWatered)
        .column(recordings::Column::RecordingAt)
        .column_as(botanists::Column::FirstName, "botanist_first_name")
        .column_as(botanists::Column::LastName, "botanist_last_name")
        .column_as(botanists::Column::Email, "botanist_email")
        .column_as(botanists::Column::Phone, "botanist_phone")
        .join(JoinType::InnerJoin, recordings::Relation::Plants.def())
        .join(JoinType::InnerJoin, plants::Relation::Botanists.def())
}

/// Object key of the snapshot for `date`: `{prefix}/{YYYY-MM-DD}.parquet`
pub fn snapshot_key(prefix: &str, date: NaiveDate) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        snapshot_file_name(date)
    } else {
        format!("{prefix}/{}", snapshot_file_name(date))
    }
}

/// Copy every recording (joined with its plant and botanist) to cold
/// storage as the snapshot for `date`, then empty the recording table.
///
/// The table is only truncated after the upload succeeded. A same-day
/// re-run replaces the earlier snapshot. An empty table uploads nothing.
///
/// # Errors
///
/// Returns the first failing step's error; when that is the query, the
/// encoding or the upload, the recording table is left as it was.
pub async fn run_archive(
    db: &DatabaseConnection,
    storage: &dyn ColdStorage,
    prefix: &str,
    date: NaiveDate,
) -> Result<ArchiveSummary, PipelineError> {
    let temp_dir = tempfile::tempdir()?;
    archive_in_dir(db, storage, prefix, date, temp_dir.path()).await
}

/// [`run_archive`] with the local snapshot file written under `work_dir`;
/// the file is removed again once uploaded.
///
/// # Errors
///
/// Same as [`run_archive`].
pub async fn archive_in_dir(
    db: &DatabaseConnection,
    storage: &dyn ColdStorage,
    prefix: &str,
    date: NaiveDate,
    work_dir: &Path,
) -> Result<ArchiveSummary, PipelineError> {
    tracing::info!("Reading the joined plant dataset...");
    let rows: Vec<SnapshotRow> = joined_readings_query()
        .order_by_asc(recordings::Column::RecordingAt)
        .order_by_asc(recordings::Column::RecordingId)
        .into_model::<SnapshotRow>()
        .all(db)
        .await
        .map_err(|e| {
            tracing::error!("Failed to read recordings for archival: {e}");
            e.to_pipeline_error("archive query")
        })?;

    if rows.is_empty() {
        tracing::warn!("No recordings to archive, skipping upload");
        return Ok(ArchiveSummary {
            rows_archived: 0,
            object_key: None,
        });
    }

    let key = snapshot_key(prefix, date);
    let path = write_snapshot_file(work_dir, date, &rows)?;

    storage.put_object(&key, &path).await.inspect_err(|e| {
        tracing::error!("Snapshot upload failed, recordings left in place: {e}");
    })?;

    std::fs::remove_file(&path)?;

    let deleted = recordings::Entity::delete_many()
        .exec(db)
        .await
        .map_err(|e| {
            tracing::error!("Snapshot {key} uploaded but truncation failed: {e}");
            e.to_pipeline_error("recording truncation")
        })?;
    tracing::info!(
        "Archived {} rows to {key}, removed {} recordings",
        rows.len(),
        deleted.rows_affected
    );

    Ok(ArchiveSummary {
        rows_archived: rows.len(),
        object_key: Some(key),
    })
}

#[cfg(test)]
mod tests;
