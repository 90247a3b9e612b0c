pub mod codec;
pub mod location;
pub mod objects;
pub mod s3;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use common::Result;
use location::StorageLocation;
use objects::UrlStorage;
use s3::{ObjectStorage, S3Manager, S3Storage};
use tracing::{debug, info, warn};

/// Per-run storage settings, passed explicitly to every read and write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageOptions {
    /// Alternate S3-compatible endpoint, e.g. a local test double.
    pub endpoint_url: Option<String>,
}

impl StorageOptions {
    pub fn with_endpoint(endpoint_url: Option<&str>) -> Self {
        Self {
            endpoint_url: endpoint_url
                .map(str::trim)
                .filter(|endpoint| !endpoint.is_empty())
                .map(str::to_string),
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }
}

/// Reads and writes whole tables addressed by URI.
#[async_trait]
pub trait TableStorage: Send + Sync {
    async fn read_table(&self, uri: &str, options: &StorageOptions) -> Result<RecordBatch>;
    async fn write_table(
        &self,
        table: &RecordBatch,
        uri: &str,
        options: &StorageOptions,
    ) -> Result<()>;
}

/// Parquet tables on S3, local disk or HTTP(S).
#[derive(Clone, Default)]
pub struct ParquetStorage {
    s3_manager: S3Manager,
}

impl ParquetStorage {
    pub fn new() -> Self {
        Self::default()
    }

    async fn backend(
        &self,
        location: &StorageLocation,
        options: &StorageOptions,
    ) -> Result<(Box<dyn ObjectStorage>, String)> {
        if let (false, Some(endpoint)) = (location.is_s3(), options.endpoint()) {
            warn!(
                location = %location,
                endpoint,
                "Endpoint override only applies to s3:// locations, ignoring it"
            );
        }

        match location {
            StorageLocation::S3 { bucket, key } => {
                debug!(bucket = %bucket, endpoint = ?options.endpoint(), "Using S3 backend");
                let storage = S3Storage::new(&self.s3_manager, bucket, options.endpoint()).await;
                Ok((Box::new(storage), key.clone()))
            }
            StorageLocation::Url(url) => {
                debug!(url = %url, "Using object store backend");
                let (storage, key) = UrlStorage::for_url(url)?;
                Ok((Box::new(storage), key))
            }
            StorageLocation::Local(path) => {
                debug!(path = %path.display(), "Using local filesystem backend");
                let (storage, key) = UrlStorage::for_local_path(path)?;
                Ok((Box::new(storage), key))
            }
        }
    }
}

#[async_trait]
impl TableStorage for ParquetStorage {
    async fn read_table(&self, uri: &str, options: &StorageOptions) -> Result<RecordBatch> {
        let location = StorageLocation::parse(uri)?;
        let (storage, key) = self.backend(&location, options).await?;

        let data = storage.get_object(&key).await?;
        info!(uri, bytes = data.len(), "Fetched input table");

        codec::decode_parquet(data)
    }

    async fn write_table(
        &self,
        table: &RecordBatch,
        uri: &str,
        options: &StorageOptions,
    ) -> Result<()> {
        let location = StorageLocation::parse(uri)?;
        let (storage, key) = self.backend(&location, options).await?;

        let data = codec::encode_parquet(table)?;
        let size = data.len();
        storage.put_object(&key, data).await?;
        info!(uri, bytes = size, rows = table.num_rows(), "Wrote output table");

        Ok(())
    }
}
