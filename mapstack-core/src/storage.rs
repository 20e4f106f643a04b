//! Content blob storage
//!
//! Revision snapshots are serialized to JSON and stored under
//! `documents/{document_id}/{version}.json`. Two backends implement
//! [`ContentStore`]: a local directory tree and an S3-compatible bucket
//! (see [`crate::object_storage`]).

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{StorageBackend, StorageConfig};
use crate::content::DocumentContent;
use crate::object_storage::{MemoryBucket, ObjectContentStore, S3BucketClient};

/// Storage-layer failures
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Suffix of every content blob key
pub const CONTENT_EXTENSION: &str = ".json";

/// Whether `key` is a content blob that `list(prefix)` reports
pub(crate) fn is_listed_key(key: &str, prefix: &str) -> bool {
    key.starts_with(prefix) && key.ends_with(CONTENT_EXTENSION)
}

/// Storage key for one revision snapshot
pub fn storage_key_for(document_id: Uuid, version: &str) -> String {
    format!("documents/{}/{}.json", document_id, version)
}

/// Persists and retrieves content snapshots by key
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Key a snapshot for `document_id` at `version` is stored under
    fn storage_key(&self, document_id: Uuid, version: &str) -> String {
        storage_key_for(document_id, version)
    }

    /// Serialize and store a snapshot, returning its key.
    /// An existing blob at the same key is overwritten.
    async fn save(
        &self,
        content: &DocumentContent,
        document_id: Uuid,
        version: &str,
    ) -> Result<String, StorageError>;

    /// Read and deserialize a snapshot
    async fn load(&self, key: &str) -> Result<DocumentContent, StorageError>;

    /// Remove a blob. Returns false when nothing was stored at `key`.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Content blob keys starting with `prefix`, sorted. A prefix that
    /// matches nothing yields an empty list.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Decode a stored blob
pub(crate) fn decode_blob(key: &str, data: &[u8]) -> Result<DocumentContent, StorageError> {
    serde_json::from_slice(data)
        .map_err(|e| StorageError::Serialization(format!("{}: {}", key, e)))
}

/// Filesystem-backed store rooted at a base directory
pub struct LocalContentStore {
    root: PathBuf,
}

impl LocalContentStore {
    /// Create the store, making the base directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::info!("Local content store at {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path under the root, rejecting escapes
    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        if key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn key_for_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn save(
        &self,
        content: &DocumentContent,
        document_id: Uuid,
        version: &str,
    ) -> Result<String, StorageError> {
        let key = self.storage_key(document_id, version);
        let path = self.resolve(&key)?;
        let data = content.to_json_bytes()?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to a sibling temp file first so readers never see a partial blob
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        tracing::debug!("Saved {} ({} bytes)", key, data.len());
        Ok(key)
    }

    async fn load(&self, key: &str) -> Result<DocumentContent, StorageError> {
        let path = self.resolve(key)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        decode_blob(key, &data)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        // Walk from the directory holding the last complete path segment
        let start = match prefix.rfind('/') {
            Some(end) if end > 0 => self.resolve(&prefix[..end])?,
            _ => self.root.clone(),
        };

        let mut keys = Vec::new();
        let mut pending = vec![start];
        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                    ) =>
                {
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Some(key) = self.key_for_path(&path) {
                    if is_listed_key(&key, prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

/// Build the content store selected by configuration
pub async fn open_content_store(
    config: &StorageConfig,
) -> Result<Arc<dyn ContentStore>, StorageError> {
    let store: Arc<dyn ContentStore> = match config.backend {
        StorageBackend::Local => Arc::new(LocalContentStore::open(&config.local_path).await?),
        StorageBackend::Minio => {
            let client = S3BucketClient::new(&config.object)?;
            Arc::new(ObjectContentStore::new(client))
        }
        StorageBackend::Memory => {
            Arc::new(ObjectContentStore::new(MemoryBucket::new(&config.object.bucket)))
        }
    };
    tracing::info!("Content storage backend: {}", store.backend_name());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::DocumentSection;
    use tempfile::TempDir;

    fn sample() -> DocumentContent {
        DocumentContent::new("A", vec![DocumentSection::new("S1", "x")])
    }

    #[test]
    fn test_storage_key_format() {
        let id = Uuid::nil();
        assert_eq!(
            storage_key_for(id, "1.2.3"),
            "documents/00000000-0000-0000-0000-000000000000/1.2.3.json"
        );
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = LocalContentStore::open(dir.path()).await.unwrap();
        let id = Uuid::new_v4();

        let key = store.save(&sample(), id, "1.0.0").await.unwrap();
        assert_eq!(key, storage_key_for(id, "1.0.0"));
        assert!(dir.path().join(&key).exists());
        assert_eq!(store.load(&key).await.unwrap(), sample());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = LocalContentStore::open(dir.path()).await.unwrap();
        let id = Uuid::new_v4();

        store.save(&sample(), id, "1.0.0").await.unwrap();
        let replacement = DocumentContent::new("B", vec![]);
        let key = store.save(&replacement, id, "1.0.0").await.unwrap();
        assert_eq!(store.load(&key).await.unwrap(), replacement);
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LocalContentStore::open(dir.path()).await.unwrap();
        let err = store.load("documents/missing/1.0.0.json").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_load_corrupt_blob_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let store = LocalContentStore::open(dir.path()).await.unwrap();
        std::fs::create_dir_all(dir.path().join("documents/x")).unwrap();
        std::fs::write(dir.path().join("documents/x/1.0.0.json"), b"not json").unwrap();

        let err = store.load("documents/x/1.0.0.json").await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_rejects_escaping_keys() {
        let dir = TempDir::new().unwrap();
        let store = LocalContentStore::open(dir.path()).await.unwrap();
        assert!(matches!(
            store.load("../etc/passwd").await.unwrap_err(),
            StorageError::InvalidKey(_)
        ));
        assert!(matches!(
            store.load("/etc/passwd").await.unwrap_err(),
            StorageError::InvalidKey(_)
        ));
    }

    /// Both backends must agree on what a prefix lists
    async fn assert_list_semantics(store: &dyn ContentStore) {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let a1 = store.save(&sample(), a, "1.0.0").await.unwrap();
        let a2 = store.save(&sample(), a, "1.1.0").await.unwrap();
        let a3 = store.save(&sample(), a, "2.0.0").await.unwrap();
        let b1 = store.save(&sample(), b, "1.0.0").await.unwrap();

        let mut all = vec![a1.clone(), a2.clone(), a3.clone(), b1];
        all.sort();
        assert_eq!(store.list("").await.unwrap(), all);
        assert_eq!(
            store.list(&format!("documents/{}/", a)).await.unwrap(),
            vec![a1.clone(), a2.clone(), a3]
        );
        assert_eq!(
            store.list(&format!("documents/{}/1.", a)).await.unwrap(),
            vec![a1.clone(), a2]
        );
        assert_eq!(store.list(&a1).await.unwrap(), vec![a1.clone()]);
        assert!(store.list(&format!("{}/more", a1)).await.unwrap().is_empty());
        assert!(store.list("documents/nothing-here/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_semantics_local() {
        let dir = TempDir::new().unwrap();
        let store = LocalContentStore::open(dir.path()).await.unwrap();
        assert_list_semantics(&store).await;

        // Leftover temp files and foreign files are not content
        std::fs::write(dir.path().join("documents/notes.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("documents/partial.json.tmp"), b"x").unwrap();
        assert_eq!(store.list("documents/").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_list_semantics_object() {
        let store = ObjectContentStore::new(MemoryBucket::new("mapstack"));
        assert_list_semantics(&store).await;
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let dir = TempDir::new().unwrap();
        let store = LocalContentStore::open(dir.path()).await.unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let k1 = store.save(&sample(), a, "1.0.0").await.unwrap();
        let k2 = store.save(&sample(), a, "1.1.0").await.unwrap();
        store.save(&sample(), b, "1.0.0").await.unwrap();

        let listed = store.list(&format!("documents/{}/", a)).await.unwrap();
        assert_eq!(listed, vec![k1.clone(), k2.clone()]);
        assert_eq!(store.list("").await.unwrap().len(), 3);
        assert!(store.list("documents/nothing-here").await.unwrap().is_empty());

        assert!(store.delete(&k1).await.unwrap());
        assert!(!store.delete(&k1).await.unwrap());
        assert_eq!(store.list(&format!("documents/{}", a)).await.unwrap(), vec![k2]);
    }
}
