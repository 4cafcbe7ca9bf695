//! Polling of the plant sensor API.
//!
//! Each plant id is requested on its own. A plant that cannot be fetched is
//! logged and left out of the batch; it never stops the other plants.

use super::models::RawReading;
use anyhow::{Context, Result};
use async_stream::stream;
use futures::Stream;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Body of `GET {base}/{plant_id}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiPlant {
    #[serde(default)]
    pub plant_id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub soil_moisture: Value,
    #[serde(default)]
    pub temperature: Value,
    #[serde(default)]
    pub last_watered: Value,
    #[serde(default)]
    pub recording_taken: Value,
    #[serde(default)]
    pub botanist: Option<ApiBotanist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiBotanist {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlantsApiClient {
    client: Client,
    base_url: String,
}

impl PlantsApiClient {
    /// # Errors
    ///
    /// Fails only if the HTTP client cannot be built (TLS backend setup).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build the plants API client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn plant_url(&self, plant_id: i32) -> String {
        format!("{}/{}", self.base_url, plant_id)
    }

    /// Fetch one plant; `None` when the API answers non-200, the request
    /// fails, or the body is not the expected JSON.
    pub async fn fetch_plant(&self, plant_id: i32) -> Option<ApiPlant> {
        tracing::info!("Retrieving data for plant ID {plant_id}");

        let response = match self.client.get(self.plant_url(plant_id)).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Error retrieving data for plant ID {plant_id}: {e}");
                return None;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Error retrieving data for plant ID {plant_id}: HTTP {status} {body}");
            return None;
        }

        match response.json::<ApiPlant>().await {
            Ok(plant) => Some(plant),
            Err(e) => {
                tracing::error!("Could not decode data for plant ID {plant_id}: {e}");
                None
            }
        }
    }
}

/// Split a botanist's display name into (first, last).
///
/// Only the first two whitespace-separated tokens are used, so
/// "Mary Ann Smith" becomes ("Mary", "Ann"). A single-token name has no
/// last name and will be dropped during cleaning.
pub fn split_botanist_name(name: &str) -> (Option<String>, Option<String>) {
    let mut tokens = name.split_whitespace();
    let first = tokens.next().map(str::to_string);
    let last = tokens.next().map(str::to_string);
    (first, last)
}

/// Flatten an API record. `requested_id` stands in when the body carries no
/// `plant_id`.
pub fn parse_plant(plant: ApiPlant, requested_id: i32) -> RawReading {
    let botanist = plant.botanist.unwrap_or(ApiBotanist {
        name: None,
        email: None,
        phone: None,
    });
    let (botanist_first_name, botanist_last_name) = botanist
        .name
        .as_deref()
        .map_or((None, None), split_botanist_name);

    let plant_id = if plant.plant_id.is_null() {
        Value::from(requested_id)
    } else {
        plant.plant_id
    };
    tracing::debug!("Parsing data for plant ID {plant_id}");

    RawReading {
        plant_id,
        plant_name: plant.name,
        soil_moisture: plant.soil_moisture,
        temperature: plant.temperature,
        last_watered: plant.last_watered,
        recording_at: plant.recording_taken,
        botanist_first_name,
        botanist_last_name,
        botanist_email: botanist.email,
        botanist_phone: botanist.phone,
    }
}

/// Lazily poll every id in `plant_ids`, one request at a time, yielding a
/// flat record for each plant that answered.
pub fn extract_readings(
    client: &PlantsApiClient,
    plant_ids: RangeInclusive<i32>,
) -> impl Stream<Item = RawReading> + '_ {
    stream! {
        for plant_id in plant_ids {
            if let Some(plant) = client.fetch_plant(plant_id).await {
                yield parse_plant(plant, plant_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Path,
        http::StatusCode as AxumStatus,
        response::{IntoResponse, Response},
        routing::get,
    };
    use futures::StreamExt;
    use serde_json::json;

    fn kurt_record() -> Value {
        json!({
            "plant_id": 1,
            "name": "Test Plant",
            "soil_moisture": 48.0,
            "temperature": 3.0,
            "last_watered": "2024-11-25T14:00:00",
            "recording_taken": "2024-11-25T13:00:00",
            "botanist": {
                "name": "Kurt Martin-Brown",
                "email": "k@x.com",
                "phone": "123"
            }
        })
    }

    async fn fake_plant(Path(plant_id): Path<i32>) -> Response {
        match plant_id {
            1 => Json(kurt_record()).into_response(),
            2 => (
                AxumStatus::NOT_FOUND,
                Json(json!({"error": "plant not found", "plant_id": 2})),
            )
                .into_response(),
            3 => (AxumStatus::OK, "sensor offline").into_response(),
            5 => {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(kurt_record()).into_response()
            }
            _ => Json(json!({
                "name": "Venus flytrap",
                "soil_moisture": "32.5",
                "temperature": 12.1,
                "last_watered": "Mon, 25 Nov 2024 13:23:10 GMT",
                "recording_taken": "2024-11-25 14:26:36",
                "botanist": {"name": "Gertrude Jekyll", "email": "g@x.com", "phone": "555"}
            }))
            .into_response(),
        }
    }

    /// Serve a stand-in for the plants API on an ephemeral port
    async fn spawn_plants_api() -> String {
        let app = Router::new().route("/plants/{plant_id}", get(fake_plant));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fake API");
        });
        format!("http://{addr}/plants/")
    }

    #[test]
    fn test_split_botanist_name() {
        assert_eq!(
            split_botanist_name("Jakub Poskrop"),
            (Some("Jakub".to_string()), Some("Poskrop".to_string()))
        );
        assert_eq!(
            split_botanist_name("Kurt Martin-Brown"),
            (Some("Kurt".to_string()), Some("Martin-Brown".to_string()))
        );
    }

    #[test]
    fn test_split_botanist_name_keeps_second_token_only() {
        assert_eq!(
            split_botanist_name("Mary Ann Smith"),
            (Some("Mary".to_string()), Some("Ann".to_string()))
        );
        assert_eq!(split_botanist_name("Cher"), (Some("Cher".to_string()), None));
        assert_eq!(split_botanist_name("  "), (None, None));
    }

    #[test]
    fn test_parse_plant() {
        let plant: ApiPlant = serde_json::from_value(kurt_record()).unwrap();
        let reading = parse_plant(plant, 1);

        assert_eq!(reading.plant_id, json!(1));
        assert_eq!(reading.plant_name.as_deref(), Some("Test Plant"));
        assert_eq!(reading.soil_moisture, json!(48.0));
        assert_eq!(reading.recording_at, json!("2024-11-25T13:00:00"));
        assert_eq!(reading.botanist_first_name.as_deref(), Some("Kurt"));
        assert_eq!(reading.botanist_last_name.as_deref(), Some("Martin-Brown"));
        assert_eq!(reading.botanist_email.as_deref(), Some("k@x.com"));
        assert_eq!(reading.botanist_phone.as_deref(), Some("123"));
    }

    #[test]
    fn test_parse_plant_without_id_or_botanist() {
        let plant: ApiPlant =
            serde_json::from_value(json!({"name": "Orchid", "soil_moisture": 20})).unwrap();
        let reading = parse_plant(plant, 42);

        assert_eq!(reading.plant_id, json!(42));
        assert_eq!(reading.temperature, Value::Null);
        assert_eq!(reading.botanist_first_name, None);
        assert_eq!(reading.botanist_email, None);
    }

    #[test]
    fn test_plant_url_tolerates_trailing_slash() {
        let client =
            PlantsApiClient::new("http://localhost/plants/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.plant_url(7), "http://localhost/plants/7");
    }

    #[tokio::test]
    async fn test_fetch_plant_success() {
        let base = spawn_plants_api().await;
        let client = PlantsApiClient::new(&base, Duration::from_secs(5)).unwrap();

        let plant = client.fetch_plant(1).await.expect("plant 1 should be returned");
        assert_eq!(plant.name.as_deref(), Some("Test Plant"));
        assert_eq!(plant.plant_id, json!(1));
    }

    #[tokio::test]
    async fn test_fetch_plant_sensor_error_is_skipped() {
        let base = spawn_plants_api().await;
        let client = PlantsApiClient::new(&base, Duration::from_secs(5)).unwrap();

        assert!(client.fetch_plant(2).await.is_none());
        assert!(client.fetch_plant(3).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_plant_transport_failure_is_skipped() {
        // Nothing listens on the discard port
        let client =
            PlantsApiClient::new("http://127.0.0.1:9/plants", Duration::from_secs(1)).unwrap();
        assert!(client.fetch_plant(1).await.is_none());
    }

    #[tokio::test]
    async fn test_extract_readings_omits_failed_ids() {
        let base = spawn_plants_api().await;
        let client = PlantsApiClient::new(&base, Duration::from_secs(5)).unwrap();

        let readings: Vec<RawReading> = extract_readings(&client, 1..=4).collect().await;

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].plant_id, json!(1));
        assert_eq!(readings[1].plant_id, json!(4));
        assert_eq!(readings[1].plant_name.as_deref(), Some("Venus flytrap"));
        assert_eq!(readings[1].botanist_last_name.as_deref(), Some("Jekyll"));
    }

    #[tokio::test]
    async fn test_slow_plant_times_out_without_stopping_the_batch() {
        let base = spawn_plants_api().await;
        let client = PlantsApiClient::new(&base, Duration::from_secs(1)).unwrap();

        assert!(client.fetch_plant(5).await.is_none());

        let readings: Vec<RawReading> = extract_readings(&client, 4..=6).collect().await;
        let names: Vec<Option<&str>> = readings
            .iter()
            .map(|r| r.plant_name.as_deref())
            .collect();
        assert_eq!(names, vec![Some("Venus flytrap"), Some("Venus flytrap")]);
        assert_eq!(readings[0].plant_id, json!(4));
        assert_eq!(readings[1].plant_id, json!(6));
    }
}
