//! Data access behind the two dashboard modes.
//!
//! Nothing here fails outward: every store or storage problem becomes a
//! notice on the returned view.

use super::models::{
    ChartPoint, DashboardView, LatestReading, MAX_HISTORICAL_DAYS, Metric, Notice, ViewMode,
};
use crate::archive::snapshot::{SnapshotRow, decode_snapshot};
use crate::archive::{joined_readings_query, snapshot_key};
use crate::common::errors::PipelineError;
use crate::external::s3::ColdStorage;
use crate::plants::models as plants;
use crate::recordings::models as recordings;
use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use std::collections::BTreeSet;

/// Distinct plant names in the operational store, alphabetical
pub async fn plant_names(db: &DatabaseConnection) -> Result<Vec<String>, DbErr> {
    plants::Entity::find()
        .select_only()
        .column(plants::Column::PlantName)
        .distinct()
        .order_by_asc(plants::Column::PlantName)
        .into_tuple::<String>()
        .all(db)
        .await
}

/// The newest `window` readings of one plant, oldest first
pub async fn recent_readings(
    db: &DatabaseConnection,
    plant_name: &str,
    window: u64,
) -> Result<Vec<SnapshotRow>, DbErr> {
    let mut rows = joined_readings_query()
        .filter(plants::Column::PlantName.eq(plant_name))
        .order_by_desc(recordings::Column::RecordingAt)
        .order_by_desc(recordings::Column::RecordingId)
        .limit(window)
        .into_model::<SnapshotRow>()
        .all(db)
        .await?;
    rows.reverse();
    Ok(rows)
}

pub fn series(rows: &[SnapshotRow], metric: Metric) -> Vec<ChartPoint> {
    rows.iter()
        .map(|row| ChartPoint {
            recording_at: row.recording_at,
            value: metric.value(row),
        })
        .collect()
}

fn with_series(mut view: DashboardView, rows: &[SnapshotRow]) -> DashboardView {
    view.temperature = series(rows, Metric::Temperature);
    view.soil_moisture = series(rows, Metric::SoilMoisture);
    view
}

/// Requested plant if given, otherwise the first name in `plants`
fn choose_plant(plants: &[String], requested: Option<&str>) -> Option<String> {
    match requested.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => Some(name.to_string()),
        None => plants.first().cloned(),
    }
}

pub async fn realtime_view(
    db: &DatabaseConnection,
    requested: Option<&str>,
    window: u64,
) -> DashboardView {
    let mut view = DashboardView::empty(ViewMode::Realtime);

    view.plants = match plant_names(db).await {
        Ok(names) => names,
        Err(e) => {
            tracing::error!("Could not list plants: {e}");
            return view.with_notice(Notice::error(format!("Could not list plants: {e}")));
        }
    };

    let Some(plant) = choose_plant(&view.plants, requested) else {
        return view.with_notice(Notice::warning("No plants have been recorded yet"));
    };
    view.selected_plant = Some(plant.clone());

    if !view.plants.contains(&plant) {
        return view.with_notice(Notice::warning(format!("No plant named '{plant}'")));
    }

    let rows = match recent_readings(db, &plant, window).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Could not read recent readings for {plant}: {e}");
            return view.with_notice(Notice::error(format!(
                "Could not read recent readings: {e}"
            )));
        }
    };

    let Some(latest) = rows.last() else {
        return view.with_notice(Notice::warning(format!(
            "No recent readings for '{plant}'"
        )));
    };
    view.latest = Some(LatestReading::from(latest));

    with_series(view, &rows)
}

/// Rows of `plant_name` recorded on any day in `start..=end`
pub fn filter_rows(
    rows: &[SnapshotRow],
    plant_name: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<SnapshotRow> {
    rows.iter()
        .filter(|row| row.plant_name == plant_name)
        .filter(|row| (start..=end).contains(&row.recording_at.date()))
        .cloned()
        .collect()
}

/// Download and decode the snapshot of every day in `start..=end`, plus the
/// day after `end`: a snapshot is named after the day the archive ran, so a
/// run just past midnight holds the previous day's readings. Days in range
/// without a snapshot are skipped and reported back; a missing day after
/// `end` is not reported.
///
/// # Errors
///
/// Returns the first download or decoding error other than a missing key.
pub async fn load_snapshots(
    storage: &dyn ColdStorage,
    prefix: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(Vec<SnapshotRow>, Vec<NaiveDate>), PipelineError> {
    let mut rows = Vec::new();
    let mut missing = Vec::new();

    let last = end.succ_opt().unwrap_or(end);
    for day in start.iter_days().take_while(|day| *day <= last) {
        let key = snapshot_key(prefix, day);
        match storage.get_object(&key).await {
            Ok(data) => rows.extend(decode_snapshot(&data)?),
            Err(PipelineError::NotFound { .. }) if day > end => {
                tracing::debug!("No snapshot for {day} ({key}) yet");
            }
            Err(PipelineError::NotFound { .. }) => {
                tracing::warn!("No snapshot for {day} ({key}), skipping");
                missing.push(day);
            }
            Err(e) => return Err(e),
        }
    }

    Ok((rows, missing))
}

fn missing_days(missing: &[NaiveDate]) -> String {
    missing
        .iter()
        .map(NaiveDate::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn historical_view(
    storage: &dyn ColdStorage,
    prefix: &str,
    requested: Option<&str>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> DashboardView {
    let start = start.unwrap_or(today);
    let end = end.unwrap_or(today);

    let mut view = DashboardView::empty(ViewMode::Historical);
    view.start_date = Some(start);
    view.end_date = Some(end);

    if start > end {
        return view.with_notice(Notice::error("Start date must not be after the end date"));
    }
    let days = (end - start).num_days() + 1;
    if days > MAX_HISTORICAL_DAYS {
        return view.with_notice(Notice::error(format!(
            "Date range covers {days} days; at most {MAX_HISTORICAL_DAYS} can be shown"
        )));
    }

    let (rows, missing) = match load_snapshots(storage, prefix, start, end).await {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("Could not load archived readings: {e}");
            return view.with_notice(Notice::error(format!(
                "Could not load archived readings: {e}"
            )));
        }
    };

    let in_range: Vec<SnapshotRow> = rows
        .into_iter()
        .filter(|row| (start..=end).contains(&row.recording_at.date()))
        .collect();

    view.plants = in_range
        .iter()
        .map(|row| row.plant_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if in_range.is_empty() {
        let mut message = format!("No archived data between {start} and {end}");
        if !missing.is_empty() {
            message.push_str(&format!(" (no snapshot for {})", missing_days(&missing)));
        }
        return view.with_notice(Notice::warning(message));
    }

    let Some(plant) = choose_plant(&view.plants, requested) else {
        return view.with_notice(Notice::warning("No plants in the archived data"));
    };
    view.selected_plant = Some(plant.clone());

    let filtered = filter_rows(&in_range, &plant, start, end);
    if filtered.is_empty() {
        return view.with_notice(Notice::warning(format!(
            "No archived readings for '{plant}' between {start} and {end}"
        )));
    }

    let mut view = with_series(view, &filtered);
    if !missing.is_empty() {
        view.notice = Some(Notice::warning(format!(
            "No snapshot for {}",
            missing_days(&missing)
        )));
    }
    view
}
