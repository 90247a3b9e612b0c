use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use common::{Error, Result};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Raw object access behind a table read or write.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Fetches the whole object. Any failure is reported as `NotFound`.
    async fn get_object(&self, key: &str) -> Result<Bytes>;
    async fn put_object(&self, key: &str, data: Bytes) -> Result<()>;
}

/// Builds S3 clients, one per endpoint, and keeps them for reuse.
#[derive(Clone, Default)]
pub struct S3Manager {
    client_cache: Arc<dashmap::DashMap<String, Arc<S3Client>>>,
}

impl S3Manager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client for the given endpoint override, or for the default AWS
    /// endpoint resolution when there is none.
    pub async fn get_client(&self, endpoint: Option<&str>) -> Arc<S3Client> {
        let cache_key = endpoint.unwrap_or_default().to_string();
        if let Some(client) = self.client_cache.get(&cache_key) {
            return client.clone();
        }

        let shared_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);

        if let Some(endpoint) = endpoint {
            debug!(endpoint, "Building S3 client with endpoint override");
            builder = builder.endpoint_url(endpoint).force_path_style(true);
            if shared_config.region().is_none() {
                builder = builder.region(Region::new(DEFAULT_REGION));
            }
        }

        let client = Arc::new(S3Client::from_conf(builder.build()));
        self.client_cache.insert(cache_key, client.clone());
        client
    }
}

pub struct S3Storage {
    bucket: String,
    client: Arc<S3Client>,
}

impl S3Storage {
    pub async fn new(s3_manager: &S3Manager, bucket: &str, endpoint: Option<&str>) -> Self {
        let client = s3_manager.get_client(endpoint).await;

        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    fn uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn get_object(&self, key: &str) -> Result<Bytes> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(err) if err.err().is_no_such_key() => Error::not_found(
                    &self.uri(key),
                    format!("Object {} not found in bucket {}", key, self.bucket),
                ),
                SdkError::ServiceError(err) => {
                    Error::not_found(&self.uri(key), err.into_err().to_string())
                }
                _ => Error::not_found(&self.uri(key), e.to_string()),
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::not_found(&self.uri(key), e.to_string()))?
            .into_bytes();

        Ok(data)
    }

    async fn put_object(&self, key: &str, data: Bytes) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| match e {
                SdkError::ServiceError(err) => Error::Storage(format!(
                    "Writing {} failed: {}",
                    self.uri(key),
                    err.into_err()
                )),
                _ => Error::Storage(format!("Writing {} failed: {}", self.uri(key), e)),
            })?;

        Ok(())
    }
}
