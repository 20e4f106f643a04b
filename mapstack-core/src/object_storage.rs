//! S3-compatible object storage backend
//!
//! [`ObjectContentStore`] implements [`ContentStore`] on top of a
//! [`BucketClient`]. The bucket is checked (and created if missing) once,
//! on first use. [`S3BucketClient`] talks to MinIO or any S3 endpoint;
//! [`MemoryBucket`] keeps objects in process.

use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};
use std::collections::BTreeMap;
use tokio::sync::{OnceCell, RwLock};
use uuid::Uuid;

use crate::config::ObjectStoreConfig;
use crate::content::DocumentContent;
use crate::storage::{decode_blob, is_listed_key, ContentStore, StorageError};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Minimal bucket operations needed by the content store
#[async_trait]
pub trait BucketClient: Send + Sync {
    fn bucket_name(&self) -> &str;

    async fn bucket_exists(&self) -> Result<bool, StorageError>;

    async fn create_bucket(&self) -> Result<(), StorageError>;

    async fn put_object(&self, key: &str, data: Bytes, content_type: &str)
    -> Result<(), StorageError>;

    /// Object body, or `None` when the key does not exist
    async fn get_object(&self, key: &str) -> Result<Option<Bytes>, StorageError>;

    async fn object_exists(&self, key: &str) -> Result<bool, StorageError>;

    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;

    /// Keys starting with `prefix`, sorted
    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

fn backend_error(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn is_missing(err: &S3Error) -> bool {
    matches!(err, S3Error::HttpFailWithBody(404, _))
}

/// Client for MinIO / S3 using path-style addressing
pub struct S3BucketClient {
    name: String,
    region: Region,
    credentials: Credentials,
    bucket: Box<Bucket>,
}

impl S3BucketClient {
    pub fn new(config: &ObjectStoreConfig) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint_url(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        let bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(backend_error)?
            .with_path_style();

        tracing::info!(
            "Object storage endpoint {} bucket '{}'",
            config.endpoint_url(),
            config.bucket
        );

        Ok(Self {
            name: config.bucket.clone(),
            region,
            credentials,
            bucket,
        })
    }
}

#[async_trait]
impl BucketClient for S3BucketClient {
    fn bucket_name(&self) -> &str {
        &self.name
    }

    async fn bucket_exists(&self) -> Result<bool, StorageError> {
        self.bucket.exists().await.map_err(backend_error)
    }

    async fn create_bucket(&self) -> Result<(), StorageError> {
        Bucket::create_with_path_style(
            &self.name,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        .map_err(backend_error)?;
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        match self.bucket.get_object(key).await {
            Ok(response) if response.status_code() == 404 => Ok(None),
            Ok(response) => Ok(Some(Bytes::copy_from_slice(response.as_slice()))),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn object_exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.bucket.head_object(key).await {
            Ok((_, status)) => Ok(status != 404),
            Err(e) if is_missing(&e) => Ok(false),
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.bucket.delete_object(key).await.map_err(backend_error)?;
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let pages = self
            .bucket
            .list(prefix.to_string(), None)
            .await
            .map_err(backend_error)?;
        let mut keys: Vec<String> = pages
            .into_iter()
            .flat_map(|page| page.contents.into_iter().map(|object| object.key))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// In-process bucket
pub struct MemoryBucket {
    name: String,
    created: RwLock<bool>,
    objects: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryBucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: RwLock::new(false),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl BucketClient for MemoryBucket {
    fn bucket_name(&self) -> &str {
        &self.name
    }

    async fn bucket_exists(&self) -> Result<bool, StorageError> {
        Ok(*self.created.read().await)
    }

    async fn create_bucket(&self) -> Result<(), StorageError> {
        *self.created.write().await = true;
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        self.objects.write().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn object_exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Content store over a bucket
pub struct ObjectContentStore<C: BucketClient> {
    client: C,
    bucket_ready: OnceCell<()>,
}

impl<C: BucketClient> ObjectContentStore<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            bucket_ready: OnceCell::new(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Make sure the bucket exists, creating it on first use
    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        self.bucket_ready
            .get_or_try_init(|| async {
                if !self.client.bucket_exists().await? {
                    self.client.create_bucket().await?;
                    tracing::info!("Bucket '{}' created", self.client.bucket_name());
                }
                Ok::<(), StorageError>(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<C: BucketClient> ContentStore for ObjectContentStore<C> {
    async fn save(
        &self,
        content: &DocumentContent,
        document_id: Uuid,
        version: &str,
    ) -> Result<String, StorageError> {
        self.ensure_bucket().await?;
        let key = self.storage_key(document_id, version);
        let data = Bytes::from(content.to_json_bytes()?);
        let size = data.len();
        self.client.put_object(&key, data, JSON_CONTENT_TYPE).await?;
        tracing::debug!("Uploaded {} ({} bytes)", key, size);
        Ok(key)
    }

    async fn load(&self, key: &str) -> Result<DocumentContent, StorageError> {
        self.ensure_bucket().await?;
        let data = self
            .client
            .get_object(key)
            .await?
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        decode_blob(key, &data)
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.ensure_bucket().await?;
        if !self.client.object_exists(key).await? {
            return Ok(false);
        }
        self.client.delete_object(key).await?;
        Ok(true)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.ensure_bucket().await?;
        let keys = self.client.list_objects(prefix).await?;
        Ok(keys
            .into_iter()
            .filter(|key| is_listed_key(key, prefix))
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "object"
    }
}
