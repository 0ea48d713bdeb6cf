//! File registry: persisted records mapping logical files to durable
//! storage references, plus reconciliation against the object store.

pub mod queries;
pub mod reconcile;
pub mod registry;

use thiserror::Error;

use crate::storage::StorageError;

pub use registry::{FileRegistry, MemoryFileRegistry};

/// File registry errors.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(i64),

    #[error("Invalid file record: {0}")]
    InvalidRecord(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
