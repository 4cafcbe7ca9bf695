use crate::botanists::models::BotanistKey;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A flattened sensor poll exactly as the source API reported it.
///
/// Numeric and timestamp cells stay loosely typed: the API occasionally
/// returns strings, nulls or sensor error text where a number belongs, and
/// deciding what survives is the transform stage's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub plant_id: Value,
    pub plant_name: Option<String>,
    pub soil_moisture: Value,
    pub temperature: Value,
    pub last_watered: Value,
    pub recording_at: Value,
    pub botanist_first_name: Option<String>,
    pub botanist_last_name: Option<String>,
    pub botanist_email: Option<String>,
    pub botanist_phone: Option<String>,
}

impl RawReading {
    pub const COLUMNS: [&'static str; 10] = [
        "plant_id",
        "plant_name",
        "soil_moisture",
        "temperature",
        "last_watered",
        "recording_at",
        "botanist_first_name",
        "botanist_last_name",
        "botanist_email",
        "botanist_phone",
    ];

    /// Cells rendered as text, in `COLUMNS` order (missing values are empty)
    pub fn to_record(&self) -> Vec<String> {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        vec![
            cell_text(&self.plant_id),
            text(&self.plant_name),
            cell_text(&self.soil_moisture),
            cell_text(&self.temperature),
            cell_text(&self.last_watered),
            cell_text(&self.recording_at),
            text(&self.botanist_first_name),
            text(&self.botanist_last_name),
            text(&self.botanist_email),
            text(&self.botanist_phone),
        ]
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A reading that passed cleaning: every column present and strictly typed,
/// soil moisture within 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanReading {
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

impl CleanReading {
    pub fn botanist_key(&self) -> BotanistKey {
        BotanistKey {
            first_name: self.botanist_first_name.clone(),
            last_name: self.botanist_last_name.clone(),
            email: self.botanist_email.clone(),
            phone: self.botanist_phone.clone(),
        }
    }
}

impl From<&CleanReading> for RawReading {
    fn from(reading: &CleanReading) -> Self {
        let timestamp = |ts: &NaiveDateTime| json!(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
        RawReading {
            plant_id: json!(reading.plant_id),
            plant_name: Some(reading.plant_name.clone()),
            soil_moisture: json!(reading.soil_moisture),
            temperature: json!(reading.temperature),
            last_watered: timestamp(&reading.last_watered),
            recording_at: timestamp(&reading.recording_at),
            botanist_first_name: Some(reading.botanist_first_name.clone()),
            botanist_last_name: Some(reading.botanist_last_name.clone()),
            botanist_email: Some(reading.botanist_email.clone()),
            botanist_phone: Some(reading.botanist_phone.clone()),
        }
    }
}
