//! In-process object store for tests and local development.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{ObjectStore, ObjectSummary, StorageError, StorageResult};

#[derive(Debug, Clone)]
struct Entry {
    content: Vec<u8>,
    content_type: Option<String>,
    last_modified: DateTime<Utc>,
}

/// `DashMap`-backed store. Presigned links use a `memory://` scheme and are
/// not retrievable over the network.
#[derive(Debug)]
pub struct MemoryObjectStore {
    bucket: String,
    objects: DashMap<String, Entry>,
    fail_writes: AtomicBool,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: DashMap::new(),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make subsequent `put` calls fail, simulating an unreachable backend.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Insert an object with an explicit modification time.
    pub fn insert_at(&self, key: &str, content: Vec<u8>, last_modified: DateTime<Utc>) {
        self.objects.insert(
            key.to_string(),
            Entry {
                content,
                content_type: None,
                last_modified,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.get(key).map(|e| e.content.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.get(key).and_then(|e| e.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(
        &self,
        key: &str,
        content: Vec<u8>,
        content_type: Option<&str>,
    ) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write(format!("write rejected for {key}")));
        }
        self.objects.insert(
            key.to_string(),
            Entry {
                content,
                content_type: content_type.map(str::to_string),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.contains_key(key))
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        Ok(format!(
            "memory://{}/{key}?expires_in={}",
            self.bucket,
            ttl.as_secs()
        ))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<ObjectSummary>> {
        let mut objects: Vec<ObjectSummary> = self
            .objects
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| ObjectSummary {
                key: e.key().clone(),
                last_modified: Some(e.value().last_modified),
            })
            .collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}
