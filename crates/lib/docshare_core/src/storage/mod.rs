//! Object storage indirection.
//!
//! [`ObjectStore`] is the seam to the durable blob backend. [`StorageResolver`]
//! sits on top of it and owns the key layout, the durable reference format
//! (`s3://{bucket}/{key}`) and the issuance of temporary retrieval links.

pub mod memory;
pub mod s3;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::files::FileType;

pub use memory::MemoryObjectStore;
pub use s3::{S3ObjectStore, S3Settings};

/// Default key namespace for uploaded documents.
pub const DEFAULT_KEY_PREFIX: &str = "documents/";

/// Default lifetime of a temporary retrieval link, in seconds.
pub const DEFAULT_LINK_TTL_SECS: u64 = 3600;

/// Scheme of durable references.
const REFERENCE_SCHEME: &str = "s3://";

pub type StorageResult<T> = Result<T, StorageError>;

/// Object storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage write failed: {0}")]
    Write(String),

    #[error("Storage access failed: {0}")]
    Access(String),
}

/// Listing entry returned by [`ObjectStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Durable binary storage addressed by key within a single bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket (or namespace) this store writes into.
    fn bucket(&self) -> &str;

    async fn put(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: Option<&str>,
    ) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Signed GET URL for exactly `key`, valid for `ttl`.
    async fn presign_get(&self, key: &str, ttl: Duration) -> StorageResult<String>;

    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectSummary>>;
}

/// Outcome of [`StorageResolver::store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Durable reference to persist in the file registry.
    pub reference: String,
    pub key: String,
    pub size: usize,
}

/// Bridges durable references and time-scoped access.
#[derive(Clone)]
pub struct StorageResolver {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    link_ttl: Duration,
}

impl std::fmt::Debug for StorageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageResolver")
            .field("bucket", &self.store.bucket())
            .field("prefix", &self.prefix)
            .field("link_ttl", &self.link_ttl)
            .finish()
    }
}

impl StorageResolver {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            link_ttl: Duration::from_secs(DEFAULT_LINK_TTL_SECS),
        }
    }

    /// Override the key namespace. A trailing `/` is added when missing.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        self.prefix = prefix;
        self
    }

    pub fn with_link_ttl(mut self, ttl: Duration) -> Self {
        self.link_ttl = ttl;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Write `content` under a fresh unique key and return its durable reference.
    ///
    /// The content is fully buffered; callers bound its size (the API's upload
    /// body limit).
    pub async fn store(&self, content: Vec<u8>, logical_name: &str) -> StorageResult<StoredObject> {
        let key = self.new_key(logical_name);
        let size = content.len();
        let content_type = FileType::from_file_name(logical_name).map(|t| t.mime_type());

        self.store
            .put(&key, content, content_type)
            .await
            .map_err(|e| match e {
                StorageError::Write(msg) => StorageError::Write(msg),
                other => StorageError::Write(other.to_string()),
            })?;

        let reference = self.reference_for(&key);
        debug!(%reference, size, "stored object");
        Ok(StoredObject {
            reference,
            key,
            size,
        })
    }

    /// Extract the storage key from a durable reference.
    ///
    /// Input that is already a bare key comes back unchanged.
    pub fn resolve_key<'a>(&self, reference: &'a str) -> &'a str {
        let bucket = self.store.bucket();
        reference
            .strip_prefix(REFERENCE_SCHEME)
            .and_then(|rest| rest.strip_prefix(bucket))
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(reference)
    }

    /// Durable reference for a key in this store's bucket.
    pub fn reference_for(&self, key: &str) -> String {
        format!("{REFERENCE_SCHEME}{}/{key}", self.store.bucket())
    }

    /// Signed, time-limited retrieval URL using the configured default TTL.
    pub async fn temporary_link(&self, reference: &str) -> StorageResult<String> {
        self.issue_temporary_link(reference, self.link_ttl.as_secs())
            .await
    }

    /// Signed retrieval URL for the one referenced object, valid `ttl_secs`.
    ///
    /// The link carries no further access control once issued.
    pub async fn issue_temporary_link(
        &self,
        reference: &str,
        ttl_secs: u64,
    ) -> StorageResult<String> {
        let key = self.resolve_key(reference);
        let exists = self
            .store
            .exists(key)
            .await
            .map_err(|e| StorageError::Access(e.to_string()))?;
        if !exists {
            return Err(StorageError::NotFound(key.to_string()));
        }
        self.store
            .presign_get(key, Duration::from_secs(ttl_secs))
            .await
            .map_err(|e| match e {
                StorageError::Access(msg) => StorageError::Access(msg),
                other => StorageError::Access(other.to_string()),
            })
    }

    /// Best-effort removal of a stored object.
    ///
    /// Used when the registry write after a successful store fails; a failure
    /// here is logged and left for orphan reconciliation.
    pub async fn discard(&self, reference: &str) {
        let key = self.resolve_key(reference);
        if let Err(e) = self.store.delete(key).await {
            warn!(key, error = %e, "failed to discard stored object");
        }
    }

    /// List objects under this resolver's key prefix.
    pub async fn list_stored(&self) -> StorageResult<Vec<ObjectSummary>> {
        self.store.list(&self.prefix).await
    }

    /// Delete the object behind a reference, propagating failures.
    pub async fn delete(&self, reference: &str) -> StorageResult<()> {
        self.store.delete(self.resolve_key(reference)).await
    }

    fn new_key(&self, logical_name: &str) -> String {
        let id = Uuid::new_v4();
        let ext = logical_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
        match ext {
            Some(ext) => format!("{}{id}.{ext}", self.prefix),
            None => format!("{}{id}", self.prefix),
        }
    }
}
