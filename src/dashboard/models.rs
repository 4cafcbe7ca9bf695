use crate::archive::snapshot::SnapshotRow;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Longest date range the historical view will download
pub const MAX_HISTORICAL_DAYS: i64 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Realtime,
    Historical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// Displayed instead of (or above) the charts when there is nothing to show
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    SoilMoisture,
}

impl Metric {
    pub fn title(self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::SoilMoisture => "Soil moisture",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::SoilMoisture => "%",
        }
    }

    pub fn value(self, row: &SnapshotRow) -> f64 {
        match self {
            Metric::Temperature => row.temperature,
            Metric::SoilMoisture => row.soil_moisture,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartPoint {
    pub recording_at: NaiveDateTime,
    pub value: f64,
}

/// Headline metrics of the most recent reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LatestReading {
    pub plant_name: String,
    pub temperature: f64,
    pub soil_moisture: f64,
    pub last_watered: NaiveDateTime,
    pub recording_at: NaiveDateTime,
}

impl From<&SnapshotRow> for LatestReading {
    fn from(row: &SnapshotRow) -> Self {
        Self {
            plant_name: row.plant_name.clone(),
            temperature: row.temperature,
            soil_moisture: row.soil_moisture,
            last_watered: row.last_watered,
            recording_at: row.recording_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardView {
    pub mode: ViewMode,
    /// Plant names available for selection, alphabetical
    pub plants: Vec<String>,
    pub selected_plant: Option<String>,
    /// Real-time mode only
    pub latest: Option<LatestReading>,
    pub temperature: Vec<ChartPoint>,
    pub soil_moisture: Vec<ChartPoint>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notice: Option<Notice>,
}

impl DashboardView {
    pub fn empty(mode: ViewMode) -> Self {
        Self {
            mode,
            plants: Vec::new(),
            selected_plant: None,
            latest: None,
            temperature: Vec::new(),
            soil_moisture: Vec::new(),
            start_date: None,
            end_date: None,
            notice: None,
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }

    pub fn series(&self, metric: Metric) -> &[ChartPoint] {
        match metric {
            Metric::Temperature => &self.temperature,
            Metric::SoilMoisture => &self.soil_moisture,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RealtimeQuery {
    /// Plant name; the first plant alphabetically when omitted
    pub plant: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoricalQuery {
    pub plant: Option<String>,
    /// First day, `YYYY-MM-DD`; today when omitted
    pub start: Option<NaiveDate>,
    /// Last day (inclusive), `YYYY-MM-DD`; today when omitted
    pub end: Option<NaiveDate>,
}
