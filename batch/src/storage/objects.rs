use super::s3::ObjectStorage;
use async_trait::async_trait;
use bytes::Bytes;
use common::{Error, Result};
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Local files and plain HTTP(S) objects, served through `object_store`.
///
/// Local writes are staged in a temporary file and renamed into place, so a
/// failed write never leaves a truncated table behind.
pub struct UrlStorage {
    store: Arc<dyn ObjectStore>,
    display_root: String,
}

impl UrlStorage {
    /// Returns the store together with the object key inside it.
    pub fn for_url(url: &Url) -> Result<(Self, String)> {
        let (store, path) = object_store::parse_url(url)?;
        let root = url[..url::Position::BeforePath].to_string();
        Ok((
            Self {
                store: Arc::from(store),
                display_root: root,
            },
            path.to_string(),
        ))
    }

    pub fn for_local_path(path: &Path) -> Result<(Self, String)> {
        let absolute = normalize_lexically(&std::path::absolute(path)?);
        let object_path = ObjectPath::from_absolute_path(&absolute)
            .map_err(|e| Error::InvalidUri(format!("{}: {}", path.display(), e)))?;
        Ok((
            Self {
                store: Arc::new(LocalFileSystem::new()),
                display_root: "file://".to_string(),
            },
            object_path.to_string(),
        ))
    }

    fn object_path(&self, key: &str) -> Result<ObjectPath> {
        ObjectPath::parse(key).map_err(|e| Error::InvalidUri(format!("{}: {}", key, e)))
    }

    fn uri(&self, key: &str) -> String {
        format!("{}/{}", self.display_root, key)
    }
}

/// Resolves `.` and `..` without touching the filesystem, so paths through
/// directories that do not exist yet still resolve.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    normalized.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                ) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[async_trait]
impl ObjectStorage for UrlStorage {
    async fn get_object(&self, key: &str) -> Result<Bytes> {
        let path = self.object_path(key)?;
        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| Error::not_found(&self.uri(key), e))?;

        result
            .bytes()
            .await
            .map_err(|e| Error::not_found(&self.uri(key), e))
    }

    async fn put_object(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.object_path(key)?;
        self.store
            .put(&path, PutPayload::from(data))
            .await
            .map_err(|e| Error::Storage(format!("Writing {} failed: {}", self.uri(key), e)))?;
        Ok(())
    }
}
