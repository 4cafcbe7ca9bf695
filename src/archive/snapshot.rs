//! Parquet encoding of the daily snapshot files.
//!
//! Column layout of `{YYYY-MM-DD}.parquet`, every column non-nullable:
//!
//! | column | type |
//! | --- | --- |
//! | `plant_id` | Int32 |
//! | `plant_name` | Utf8 |
//! | `soil_moisture`, `temperature` | Float64 |
//! | `last_watered`, `recording_at` | Timestamp(µs), no time zone |
//! | `botanist_first_name`, `botanist_last_name`, `botanist_email`, `botanist_phone` | Utf8 |

use crate::common::errors::PipelineError;
use arrow::array::{
    Array, ArrayRef, Float64Array, Int32Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One row of the plant ⋈ recording ⋈ botanist join
#[derive(Debug, Clone, PartialEq, FromQueryResult, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub plant_id: i32,
    pub plant_name: String,
    pub soil_moisture: f64,
    pub temperature: f64,
    pub last_watered: NaiveDateTime,
    pub recording_at: NaiveDateTime,
    pub botanist_first_name: String,
    pub botanist_last_name: String,
    pub botanist_email: String,
    pub botanist_phone: String,
}

pub fn snapshot_file_name(date: NaiveDate) -> String {
    format!("{}.parquet", date.format("%Y-%m-%d"))
}

fn snapshot_schema() -> Arc<Schema> {
    let timestamp = DataType::Timestamp(TimeUnit::Microsecond, None);
    Arc::new(Schema::new(vec![
        Field::new("plant_id", DataType::Int32, false),
        Field::new("plant_name", DataType::Utf8, false),
        Field::new("soil_moisture", DataType::Float64, false),
        Field::new("temperature", DataType::Float64, false),
        Field::new("last_watered", timestamp.clone(), false),
        Field::new("recording_at", timestamp, false),
        Field::new("botanist_first_name", DataType::Utf8, false),
        Field::new("botanist_last_name", DataType::Utf8, false),
        Field::new("botanist_email", DataType::Utf8, false),
        Field::new("botanist_phone", DataType::Utf8, false),
    ]))
}

fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build()
}

fn string_column(rows: &[SnapshotRow], field: impl Fn(&SnapshotRow) -> &str) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(field).collect::<Vec<_>>()))
}

fn micros(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros()
}

/// Encode rows as a single-batch Parquet file.
///
/// # Errors
///
/// Returns `PipelineError::Snapshot` if Arrow or Parquet rejects the data.
pub fn encode_snapshot(rows: &[SnapshotRow]) -> Result<Bytes, PipelineError> {
    let schema = snapshot_schema();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int32Array::from(
            rows.iter().map(|r| r.plant_id).collect::<Vec<_>>(),
        )),
        string_column(rows, |r| &r.plant_name),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.soil_moisture).collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.temperature).collect::<Vec<_>>(),
        )),
        Arc::new(TimestampMicrosecondArray::from(
            rows.iter().map(|r| micros(&r.last_watered)).collect::<Vec<_>>(),
        )),
        Arc::new(TimestampMicrosecondArray::from(
            rows.iter().map(|r| micros(&r.recording_at)).collect::<Vec<_>>(),
        )),
        string_column(rows, |r| &r.botanist_first_name),
        string_column(rows, |r| &r.botanist_last_name),
        string_column(rows, |r| &r.botanist_email),
        string_column(rows, |r| &r.botanist_phone),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|e| PipelineError::snapshot(format!("record batch build failed: {e}")))?;

    let mut cursor = Cursor::new(Vec::<u8>::new());
    let mut writer = ArrowWriter::try_new(&mut cursor, schema, Some(writer_properties()))
        .map_err(|e| PipelineError::snapshot(format!("parquet writer init failed: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| PipelineError::snapshot(format!("parquet write failed: {e}")))?;
    writer
        .close()
        .map_err(|e| PipelineError::snapshot(format!("parquet close failed: {e}")))?;

    Ok(Bytes::from(cursor.into_inner()))
}

/// Encode `rows` into `{dir}/{YYYY-MM-DD}.parquet` and return the path.
///
/// # Errors
///
/// Returns `PipelineError::Snapshot` on encoding failure and
/// `PipelineError::Io` if the file cannot be written.
pub fn write_snapshot_file(
    dir: &Path,
    date: NaiveDate,
    rows: &[SnapshotRow],
) -> Result<PathBuf, PipelineError> {
    let data = encode_snapshot(rows)?;
    let path = dir.join(snapshot_file_name(date));
    std::fs::write(&path, &data)?;
    tracing::info!(
        "Wrote {} rows ({} bytes) to {}",
        rows.len(),
        data.len(),
        path.display()
    );
    Ok(path)
}

fn column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a T, PipelineError> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|e| PipelineError::snapshot(format!("missing column '{name}': {e}")))?;
    let array = batch.column(idx);
    if array.null_count() > 0 {
        return Err(PipelineError::snapshot(format!(
            "column '{name}' contains nulls"
        )));
    }
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        PipelineError::snapshot(format!(
            "column '{name}' is not {}",
            std::any::type_name::<T>()
        ))
    })
}

fn timestamp_at(
    array: &TimestampMicrosecondArray,
    row: usize,
    name: &str,
) -> Result<NaiveDateTime, PipelineError> {
    let value = array.value(row);
    DateTime::from_timestamp_micros(value)
        .map(|ts| ts.naive_utc())
        .ok_or_else(|| {
            PipelineError::snapshot(format!("column '{name}' holds out-of-range value {value}"))
        })
}

/// Decode a snapshot produced by [`encode_snapshot`].
///
/// # Errors
///
/// Returns `PipelineError::Snapshot` if the bytes are not Parquet or a
/// column is missing, mistyped or null.
pub fn decode_snapshot(data: &Bytes) -> Result<Vec<SnapshotRow>, PipelineError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(data.clone())
        .map_err(|e| PipelineError::snapshot(format!("parquet reader init failed: {e}")))?
        .build()
        .map_err(|e| PipelineError::snapshot(format!("parquet reader build failed: {e}")))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch
            .map_err(|e| PipelineError::snapshot(format!("parquet read batch failed: {e}")))?;

        let plant_id = column::<Int32Array>(&batch, "plant_id")?;
        let plant_name = column::<StringArray>(&batch, "plant_name")?;
        let soil_moisture = column::<Float64Array>(&batch, "soil_moisture")?;
        let temperature = column::<Float64Array>(&batch, "temperature")?;
        let last_watered = column::<TimestampMicrosecondArray>(&batch, "last_watered")?;
        let recording_at = column::<TimestampMicrosecondArray>(&batch, "recording_at")?;
        let first_name = column::<StringArray>(&batch, "botanist_first_name")?;
        let last_name = column::<StringArray>(&batch, "botanist_last_name")?;
        let email = column::<StringArray>(&batch, "botanist_email")?;
        let phone = column::<StringArray>(&batch, "botanist_phone")?;

        for row in 0..batch.num_rows() {
            rows.push(SnapshotRow {
                plant_id: plant_id.value(row),
                plant_name: plant_name.value(row).to_string(),
                soil_moisture: soil_moisture.value(row),
                temperature: temperature.value(row),
                last_watered: timestamp_at(last_watered, row, "last_watered")?,
                recording_at: timestamp_at(recording_at, row, "recording_at")?,
                botanist_first_name: first_name.value(row).to_string(),
                botanist_last_name: last_name.value(row).to_string(),
                botanist_email: email.value(row).to_string(),
                botanist_phone: phone.value(row).to_string(),
            });
        }
    }

    Ok(rows)
}
