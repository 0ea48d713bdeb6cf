//! File registry backends.
//!
//! [`FileRegistry`] is implemented directly on `PgPool`, so callers holding a
//! pool pass `&pool`. [`MemoryFileRegistry`] backs unit tests.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sqlx::PgPool;

use super::FileError;
use super::queries;
use crate::models::files::{FileRecord, NewFile};

/// Persisted file records keyed by generated id.
#[async_trait]
pub trait FileRegistry: Send + Sync {
    async fn insert(&self, file: &NewFile) -> Result<FileRecord, FileError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<FileRecord>, FileError>;

    /// Durable references of every registered file.
    async fn list_paths(&self) -> Result<Vec<String>, FileError>;
}

#[async_trait]
impl FileRegistry for PgPool {
    async fn insert(&self, file: &NewFile) -> Result<FileRecord, FileError> {
        queries::insert_file(self, file).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<FileRecord>, FileError> {
        queries::find_file_by_id(self, id).await
    }

    async fn list_paths(&self) -> Result<Vec<String>, FileError> {
        queries::list_file_paths(self).await
    }
}

/// `DashMap`-backed registry with insert-failure injection.
#[derive(Debug)]
pub struct MemoryFileRegistry {
    records: DashMap<i64, FileRecord>,
    next_id: AtomicI64,
    fail_inserts: AtomicBool,
}

impl Default for MemoryFileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileRegistry {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicI64::new(1),
            fail_inserts: AtomicBool::new(false),
        }
    }

    /// Make subsequent inserts fail, simulating a lost database write.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl FileRegistry for MemoryFileRegistry {
    async fn insert(&self, file: &NewFile) -> Result<FileRecord, FileError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(FileError::DbError(sqlx::Error::PoolClosed));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = FileRecord {
            id,
            file_name: file.file_name.clone(),
            file_path: file.file_path.clone(),
            file_type: file.file_type,
            file_size: file.file_size,
            owner_id: file.owner_id,
            created_at: Utc::now(),
        };
        self.records.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<FileRecord>, FileError> {
        Ok(self.records.get(&id).map(|r| r.clone()))
    }

    async fn list_paths(&self) -> Result<Vec<String>, FileError> {
        Ok(self.records.iter().map(|r| r.file_path.clone()).collect())
    }
}
