//! Type coercion and validity filtering of extracted readings.
//!
//! Nothing in here returns an error. A cell that does not parse becomes a
//! missing value and the row carrying it is dropped.

use super::models::{CleanReading, RawReading};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::ops::RangeInclusive;

pub const SOIL_MOISTURE_RANGE: RangeInclusive<f64> = 0.0..=100.0;

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Clean a whole batch. Surviving rows keep their input order.
pub fn clean_readings(raw: &[RawReading]) -> Vec<CleanReading> {
    let cleaned: Vec<CleanReading> = raw.iter().filter_map(clean_reading).collect();
    if cleaned.len() < raw.len() {
        tracing::info!(
            "Dropped {} of {} readings that failed type or range checks",
            raw.len() - cleaned.len(),
            raw.len()
        );
    }
    cleaned
}

fn clean_reading(raw: &RawReading) -> Option<CleanReading> {
    let recording_at = parse_timestamp(&raw.recording_at);
    let last_watered = parse_timestamp(&raw.last_watered);

    let soil_moisture = parse_number(&raw.soil_moisture);
    let temperature = parse_number(&raw.temperature);
    let plant_id = parse_plant_id(&raw.plant_id);

    let plant_name = raw.plant_name.as_deref().map(trim_plant_name);

    let soil_moisture = soil_moisture.filter(|moisture| SOIL_MOISTURE_RANGE.contains(moisture));

    Some(CleanReading {
        plant_id: plant_id?,
        plant_name: plant_name?,
        soil_moisture: soil_moisture?,
        temperature: temperature?,
        last_watered: last_watered?,
        recording_at: recording_at?,
        botanist_first_name: raw.botanist_first_name.clone()?,
        botanist_last_name: raw.botanist_last_name.clone()?,
        botanist_email: raw.botanist_email.clone()?,
        botanist_phone: raw.botanist_phone.clone()?,
    })
}

/// Numbers and numeric strings; NaN and infinities count as missing
pub fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Plant ids must be whole numbers that fit the `plant.plant_id` column
pub fn parse_plant_id(value: &Value) -> Option<i32> {
    if let Some(id) = value.as_i64() {
        return i32::try_from(id).ok();
    }
    let number = parse_number(value)?;
    if number.fract() != 0.0 || number < f64::from(i32::MIN) || number > f64::from(i32::MAX) {
        return None;
    }
    // Safe cast: integral and range-checked above
    #[allow(clippy::cast_possible_truncation)]
    Some(number as i32)
}

pub fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

/// Accepts ISO-8601 (with `T` or space), RFC 3339, RFC 2822 / HTTP dates and
/// bare `YYYY-MM-DD` dates. Offsets are normalised to UTC.
pub fn parse_timestamp_str(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_utc());
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(s) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Strip whitespace and stray quoting/punctuation from both ends
pub fn trim_plant_name(name: &str) -> String {
    name.trim_matches(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | ',' | ';' | '.'))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[allow(clippy::too_many_arguments)]
    fn raw(
        plant_id: Value,
        plant_name: &str,
        soil_moisture: Value,
        temperature: Value,
        last_watered: Value,
        recording_at: Value,
        first_name: Option<&str>,
        email: Option<&str>,
    ) -> RawReading {
        RawReading {
            plant_id,
            plant_name: Some(plant_name.to_string()),
            soil_moisture,
            temperature,
            last_watered,
            recording_at,
            botanist_first_name: first_name.map(str::to_string),
            botanist_last_name: Some("Smith".to_string()),
            botanist_email: email.map(str::to_string),
            botanist_phone: Some("1234567890".to_string()),
        }
    }

    fn valid(plant_id: i64, plant_name: &str, soil_moisture: Value) -> RawReading {
        raw(
            json!(plant_id),
            plant_name,
            soil_moisture,
            json!(20),
            json!("2023-11-01"),
            json!("2023-11-25"),
            Some("Alice"),
            Some("alice@example.com"),
        )
    }

    #[test]
    fn test_clean_typing_and_missing_value_removal() {
        let batch = vec![
            valid(1, "Rose", json!(50)),
            raw(
                json!(2),
                "Tulip",
                json!("invalid"),
                json!(25),
                json!("invalid_date"),
                json!("invalid_date"),
                Some("Bob"),
                Some("bob@example.com"),
            ),
            raw(
                json!("invalid"),
                "Lily",
                json!(30),
                json!("invalid"),
                json!("2023-11-15"),
                json!("2023-11-25"),
                None,
                None,
            ),
        ];

        let cleaned = clean_readings(&batch);

        assert_eq!(cleaned.len(), 1);
        let rose = &cleaned[0];
        assert_eq!(rose.plant_id, 1);
        assert_eq!(rose.plant_name, "Rose");
        assert!((rose.soil_moisture - 50.0).abs() < f64::EPSILON);
        assert_eq!(
            rose.recording_at,
            NaiveDate::from_ymd_opt(2023, 11, 25)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_clean_soil_moisture_range() {
        let batch = vec![
            valid(1, "Rose", json!(50)),
            valid(2, "Tulip", json!(120)),
            valid(3, "Lily", json!(-10)),
        ];

        let cleaned = clean_readings(&batch);

        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].plant_name, "Rose");
    }

    #[test]
    fn test_clean_soil_moisture_bounds_are_inclusive() {
        let batch = vec![
            valid(1, "Rose", json!(0)),
            valid(2, "Tulip", json!(100.0)),
            valid(3, "Lily", json!(100.0001)),
            valid(4, "Fern", json!(-0.0001)),
        ];

        let ids: Vec<i32> = clean_readings(&batch).iter().map(|r| r.plant_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_clean_invalid_dates() {
        let mut tulip = valid(2, "Tulip", json!(60));
        tulip.recording_at = json!("invalid_date");
        let batch = vec![valid(1, "Rose", json!(50)), tulip];

        let cleaned = clean_readings(&batch);

        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].plant_name, "Rose");
    }

    #[test]
    fn test_clean_keeps_fully_valid_batch_in_order() {
        let batch = vec![
            valid(3, "Lily", json!(30)),
            valid(1, "Rose", json!("50")),
            valid(2, "Tulip", json!(60.5)),
        ];

        let ids: Vec<i32> = clean_readings(&batch).iter().map(|r| r.plant_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_clean_empty_batch() {
        assert!(clean_readings(&[]).is_empty());
    }

    #[test]
    fn test_clean_is_idempotent() {
        let mut messy = valid(5, "  \"Snake plant\", ", json!("41.25"));
        messy.last_watered = json!("Mon, 25 Nov 2024 13:23:10 GMT");
        messy.recording_at = json!("2024-11-25 14:26:36.123456");
        let batch = vec![valid(1, "Rose", json!(50)), messy, valid(2, "Tulip", json!(101))];

        let once = clean_readings(&batch);
        let as_raw: Vec<RawReading> = once.iter().map(RawReading::from).collect();
        let twice = clean_readings(&as_raw);

        assert_eq!(once.len(), 2);
        assert_eq!(once, twice);
        assert_eq!(once[1].plant_name, "Snake plant");
    }

    #[test]
    fn test_survival_requires_every_parse_and_range_check() {
        let base = valid(1, "Rose", json!(50));
        assert_eq!(clean_readings(std::slice::from_ref(&base)).len(), 1);

        let mutations: [fn(&mut RawReading); 7] = [
            |r| r.recording_at = json!("not a date"),
            |r| r.last_watered = Value::Null,
            |r| r.soil_moisture = json!("wet"),
            |r| r.temperature = json!("NaN"),
            |r| r.plant_id = json!(1.5),
            |r| r.soil_moisture = json!(100.5),
            |r| r.botanist_phone = None,
        ];
        for mutate in mutations {
            let mut row = base.clone();
            mutate(&mut row);
            assert!(
                clean_readings(&[row.clone()]).is_empty(),
                "row should have been dropped: {row:?}"
            );
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(&json!(48.0)), Some(48.0));
        assert_eq!(parse_number(&json!(" 3.5 ")), Some(3.5));
        assert_eq!(parse_number(&json!("invalid")), None);
        assert_eq!(parse_number(&json!("inf")), None);
        assert_eq!(parse_number(&Value::Null), None);
        assert_eq!(parse_number(&json!(true)), None);
    }

    #[test]
    fn test_parse_plant_id() {
        assert_eq!(parse_plant_id(&json!(7)), Some(7));
        assert_eq!(parse_plant_id(&json!("12")), Some(12));
        assert_eq!(parse_plant_id(&json!(3.0)), Some(3));
        assert_eq!(parse_plant_id(&json!(3.2)), None);
        assert_eq!(parse_plant_id(&json!(i64::MAX)), None);
        assert_eq!(parse_plant_id(&json!("invalid")), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 11, 25)
            .unwrap()
            .and_hms_opt(13, 23, 10)
            .unwrap();

        for input in [
            "2024-11-25T13:23:10",
            "2024-11-25 13:23:10",
            "2024-11-25T13:23:10Z",
            "2024-11-25T14:23:10+01:00",
            "Mon, 25 Nov 2024 13:23:10 GMT",
        ] {
            assert_eq!(parse_timestamp_str(input), Some(expected), "input: {input}");
        }

        assert!(parse_timestamp_str("2024-11-25 13:23:10.5").is_some());
        assert!(parse_timestamp_str("25/11/2024").is_none());
        assert!(parse_timestamp_str("").is_none());
        assert_eq!(parse_timestamp(&json!(1_732_541_000)), None);
    }

    #[test]
    fn test_trim_plant_name() {
        assert_eq!(trim_plant_name(" Rose "), "Rose");
        assert_eq!(trim_plant_name("'Bird of paradise',"), "Bird of paradise");
        assert_eq!(trim_plant_name("Epipremnum Aureum"), "Epipremnum Aureum");
    }
}
