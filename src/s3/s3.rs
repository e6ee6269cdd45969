use crate::config::S3Config;
use crate::s3::error::StorageError;
use crate::s3::storage::Storage;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
#[cfg(test)]
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, info};

const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Real S3 implementation of the Storage trait
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Create a new S3Storage from the shared AWS configuration
    pub fn new(sdk_config: &SdkConfig, config: &S3Config) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config)
            .force_path_style(config.force_path_style);

        if let Some(endpoint) = &config.endpoint {
            info!("Using custom S3 endpoint: {}", endpoint);
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());

        info!("Created S3 client for bucket {}", config.bucket);

        Self {
            client,
            bucket: config.bucket.clone(),
        }
    }
}

/// Classify an SDK failure by its service error code
fn classify<E>(key: &str, error: SdkError<E>, fallback: impl FnOnce(String) -> StorageError) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match &error {
        SdkError::ServiceError(service_err) => match service_err.err().code() {
            Some("NoSuchKey") | Some("KeyNotFound") | Some("NotFound") => {
                StorageError::ObjectNotFound(key.to_string())
            }
            Some("AccessDenied") => StorageError::AccessDenied(key.to_string(), error.to_string()),
            _ => fallback(error.to_string()),
        },
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            StorageError::ConnectionError(error.to_string())
        }
        _ => fallback(error.to_string()),
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        destination_key: &str,
    ) -> Result<(), StorageError> {
        debug!(
            "Copying s3://{}/{} to s3://{}/{}",
            bucket, source_key, bucket, destination_key
        );

        let copy_source = format!("{}/{}", bucket, urlencoding::encode(source_key));

        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(copy_source)
            .key(destination_key)
            .send()
            .await
            .map_err(|e| {
                classify(source_key, e, |message| {
                    StorageError::CopyError(
                        source_key.to_string(),
                        destination_key.to_string(),
                        message,
                    )
                })
            })?;

        debug!("Copied {} to {}", source_key, destination_key);
        Ok(())
    }

    async fn presign_upload(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignError(key.to_string(), e.to_string()))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(IMAGE_CONTENT_TYPE)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::PresignError(key.to_string(), e.to_string()))?;

        Ok(request.uri().to_string())
    }

    #[cfg(test)]
    async fn add_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(data.into())
            .send()
            .await
            .map_err(|e| {
                StorageError::Other(anyhow::anyhow!("Failed to put object '{}': {}", key, e))
            })?;
        Ok(())
    }

    #[cfg(test)]
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                classify(key, e, |message| {
                    StorageError::Other(anyhow::anyhow!("Failed to get object: {}", message))
                })
            })?;

        let data = response.body.collect().await.map_err(|e| {
            StorageError::Other(anyhow::anyhow!("Failed to read object body: {}", e))
        })?;
        Ok(data.into_bytes())
    }
}
