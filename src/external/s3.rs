use crate::common::errors::PipelineError;
use crate::config::Config;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use std::path::Path;

/// Object store holding the daily snapshots
#[async_trait]
pub trait ColdStorage: Send + Sync {
    /// Upload a local file under `key`, replacing any object already there
    async fn put_object(&self, key: &str, path: &Path) -> Result<(), PipelineError>;

    /// Download a whole object. A missing key is `PipelineError::NotFound`.
    async fn get_object(&self, key: &str) -> Result<Bytes, PipelineError>;
}

pub async fn get_client(config: &Config) -> S3Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()));

    if let (Some(access_key), Some(secret_key)) =
        (&config.aws_access_key_id, &config.aws_secret_access_key)
    {
        let credentials = Credentials::new(access_key, secret_key, None, None, "manual");
        loader = loader.credentials_provider(credentials);
    }
    if let Some(url) = &config.s3_url {
        loader = loader.endpoint_url(url);
    }

    let shared_config = loader.load().await;

    // Self-hosted endpoints (MinIO) do not resolve virtual-hosted bucket names
    let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
        .force_path_style(config.s3_url.is_some())
        .build();

    S3Client::from_conf(s3_config)
}

pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    pub async fn from_config(config: &Config) -> Self {
        Self::new(get_client(config).await, &config.s3_bucket)
    }
}

#[async_trait]
impl ColdStorage for S3Storage {
    async fn put_object(&self, key: &str, path: &Path) -> Result<(), PipelineError> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| PipelineError::storage("upload", key, e))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Upload of {key} to bucket {} failed: {e}", self.bucket);
                PipelineError::storage("upload", key, DisplayErrorContext(&e))
            })?;

        tracing::info!("Uploaded {key} to bucket {}", self.bucket);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, PipelineError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    PipelineError::NotFound {
                        key: key.to_string(),
                    }
                } else {
                    PipelineError::storage("download", key, DisplayErrorContext(&e))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| PipelineError::storage("download", key, e))?;

        Ok(data.into_bytes())
    }
}
