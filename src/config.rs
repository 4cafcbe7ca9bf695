use anyhow::{Context, Result, anyhow, bail};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::ops::RangeInclusive;
use std::time::Duration;

const DEFAULT_PLANTS_API_URL: &str = "https://data-eng-plants-api.herokuapp.com/plants";
const DEFAULT_ALLOWED_SCHEMAS: &str = "public,gamma";

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub db_url: String,
    /// Postgres schema holding the botanist, plant and recording tables.
    /// Checked against `ALLOWED_SCHEMAS` before it ever reaches the driver.
    pub db_schema: String,
    pub app_name: String,
    pub plants_api_url: String,
    pub plant_id_start: i32,
    pub plant_id_end: i32,
    pub api_timeout_secs: u64,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_region: String,
    pub s3_url: Option<String>,
    pub s3_bucket: String,
    pub s3_key_prefix: String,
    pub data_dir: Option<String>,
    pub realtime_window: u64,
    pub dashboard_addr: String,
}

impl Config {
    /// # Errors
    ///
    /// Returns an error naming the variable when a required variable is
    /// missing, a numeric variable does not parse, or `SCHEMA_NAME` is not
    /// on the allow-list.
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load from .env file if available

        let db_url = match env::var("DB_URL") {
            Ok(url) => url,
            Err(_) => format!(
                "{}://{}:{}@{}:{}/{}",
                env::var("DB_PREFIX").unwrap_or_else(|_| "postgresql".to_string()),
                required("DB_USER")?,
                required("DB_PASSWORD")?,
                required("DB_HOST")?,
                env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string()),
                required("DB_NAME")?,
            ),
        };

        let allowed = env::var("ALLOWED_SCHEMAS")
            .unwrap_or_else(|_| DEFAULT_ALLOWED_SCHEMAS.to_string());
        let db_schema = validate_schema_name(
            &env::var("SCHEMA_NAME").unwrap_or_else(|_| "public".to_string()),
            &allowed,
        )?;

        let config = Config {
            db_url,
            db_schema,
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "plant-monitor".to_string()),
            plants_api_url: env::var("PLANTS_API_URL")
                .unwrap_or_else(|_| DEFAULT_PLANTS_API_URL.to_string()),
            plant_id_start: parsed_or("PLANT_ID_START", 1)?,
            plant_id_end: parsed_or("PLANT_ID_END", 50)?,
            api_timeout_secs: parsed_or("API_TIMEOUT_SECS", 10)?,
            aws_access_key_id: env::var("ACCESS_KEY_ID").ok(),
            aws_secret_access_key: env::var("SECRET_ACCESS_KEY").ok(),
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "eu-west-2".to_string()),
            s3_url: env::var("S3_URL").ok().filter(|url| !url.is_empty()),
            s3_bucket: required("S3_BUCKET")?,
            s3_key_prefix: env::var("S3_KEY").unwrap_or_else(|_| "plant_data".to_string()),
            data_dir: env::var("DATA_DIR").ok().filter(|dir| !dir.is_empty()),
            realtime_window: parsed_or("REALTIME_WINDOW", 200)?,
            dashboard_addr: env::var("DASHBOARD_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        };

        if config.plant_id_start > config.plant_id_end {
            bail!(
                "PLANT_ID_START ({}) must not exceed PLANT_ID_END ({})",
                config.plant_id_start,
                config.plant_id_end
            );
        }

        Ok(config)
    }

    pub fn plant_ids(&self) -> RangeInclusive<i32> {
        self.plant_id_start..=self.plant_id_end
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            db_url: "sqlite::memory:".to_string(),
            // SQLite exposes the attached database as `main`
            db_schema: "main".to_string(),
            app_name: "plant-monitor-test".to_string(),
            plants_api_url: "http://127.0.0.1:9/plants".to_string(),
            plant_id_start: 1,
            plant_id_end: 3,
            api_timeout_secs: 2,
            aws_access_key_id: Some("test-access-key".to_string()),
            aws_secret_access_key: Some("test-secret-key".to_string()),
            aws_region: "eu-west-2".to_string(),
            s3_url: Some("http://localhost:9000".to_string()),
            s3_bucket: "test-bucket".to_string(),
            s3_key_prefix: "plant_data".to_string(),
            data_dir: None,
            realtime_window: 200,
            dashboard_addr: "127.0.0.1:0".to_string(),
        }
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} must be set"))
}

fn parsed_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

/// Accept a schema name only if it is a plain SQL identifier that appears in
/// the comma-separated allow-list.
pub fn validate_schema_name(schema: &str, allow_list: &str) -> Result<String> {
    let schema = schema.trim();
    let is_identifier = schema
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && schema.len() <= 63
        && schema.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !is_identifier {
        return Err(anyhow!("SCHEMA_NAME {schema:?} is not a valid identifier"));
    }

    if allow_list
        .split(',')
        .map(str::trim)
        .any(|allowed| allowed == schema)
    {
        Ok(schema.to_string())
    } else {
        Err(anyhow!(
            "SCHEMA_NAME {schema:?} is not in the allowed schemas ({allow_list})"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_on_allow_list_is_accepted() {
        assert_eq!(
            validate_schema_name("gamma", "public, gamma").unwrap(),
            "gamma"
        );
        assert_eq!(validate_schema_name(" public ", "public").unwrap(), "public");
    }

    #[test]
    fn test_schema_not_on_allow_list_is_rejected() {
        let err = validate_schema_name("delta", "public,gamma").unwrap_err();
        assert!(err.to_string().contains("not in the allowed schemas"));
    }

    #[test]
    fn test_schema_with_sql_is_rejected_even_if_listed() {
        let hostile = "gamma; DROP TABLE plant";
        assert!(validate_schema_name(hostile, hostile).is_err());
        assert!(validate_schema_name("", "").is_err());
        assert!(validate_schema_name("1gamma", "1gamma").is_err());
    }

    #[test]
    fn test_for_tests_config_is_consistent() {
        let config = Config::for_tests();
        assert_eq!(config.plant_ids(), 1..=3);
        assert_eq!(config.api_timeout(), Duration::from_secs(2));
        assert_eq!(config.db_schema, "main");
    }
}
