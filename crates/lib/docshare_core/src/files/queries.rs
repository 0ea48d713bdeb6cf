//! File registry queries.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::FileError;
use crate::models::files::{FileRecord, NewFile};

type FileRow = (i64, String, String, String, i64, i64, DateTime<Utc>);

const FILE_COLUMNS: &str = "id, file_name, file_path, file_type, file_size, owner_id, created_at";

fn record_from_row(row: FileRow) -> Result<FileRecord, FileError> {
    let (id, file_name, file_path, file_type, file_size, owner_id, created_at) = row;
    Ok(FileRecord {
        id,
        file_name,
        file_path,
        file_type: file_type.parse().map_err(FileError::InvalidRecord)?,
        file_size,
        owner_id,
        created_at,
    })
}

/// Register a stored file. The owner must reference an existing identity.
pub async fn insert_file(pool: &PgPool, file: &NewFile) -> Result<FileRecord, FileError> {
    let sql = format!(
        "INSERT INTO files (file_name, file_path, file_type, file_size, owner_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {FILE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, FileRow>(&sql)
        .bind(&file.file_name)
        .bind(&file.file_path)
        .bind(file.file_type.as_str())
        .bind(file.file_size)
        .bind(file.owner_id)
        .fetch_one(pool)
        .await?;
    record_from_row(row)
}

/// Fetch a file record by id.
pub async fn find_file_by_id(pool: &PgPool, id: i64) -> Result<Option<FileRecord>, FileError> {
    let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = $1");
    let row = sqlx::query_as::<_, FileRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(record_from_row).transpose()
}

/// All durable references currently registered.
pub async fn list_file_paths(pool: &PgPool) -> Result<Vec<String>, FileError> {
    let paths = sqlx::query_scalar::<_, String>("SELECT file_path FROM files")
        .fetch_all(pool)
        .await?;
    Ok(paths)
}
