//! File service — role-gated upload and temporary-link download.

use docshare_core::auth::policy::{Operation, authorize};
use docshare_core::files::{FileError, FileRegistry};
use docshare_core::models::auth::Identity;
use docshare_core::models::files::{FileType, NewFile};
use docshare_core::storage::StorageResolver;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{FileDownloadResponse, FileUploadResponse};

/// Gate an upload on the caller's role.
pub fn authorize_upload(user: &Identity) -> AppResult<()> {
    authorize(Operation::Upload, Some(user.role)).map_err(|e| {
        warn!(username = %user.username, role = %user.role, "upload denied");
        AppError::from(e)
    })
}

/// Validate the uploaded file name's extension.
pub fn check_file_type(file_name: &str) -> AppResult<FileType> {
    FileType::from_file_name(file_name).ok_or_else(|| {
        AppError::Validation(format!(
            "File type not allowed. Allowed types: {}",
            FileType::allowed_list()
        ))
    })
}

/// Store the content, then register it under the caller's identity.
///
/// Role is checked before extension, and both before anything is stored. If
/// registration fails the stored object is discarded best-effort.
pub async fn upload(
    registry: &dyn FileRegistry,
    storage: &StorageResolver,
    user: &Identity,
    file_name: &str,
    content: Vec<u8>,
) -> AppResult<FileUploadResponse> {
    authorize_upload(user)?;
    let file_type = check_file_type(file_name)?;

    let stored = storage.store(content, file_name).await?;

    let new_file = NewFile {
        file_name: file_name.to_string(),
        file_path: stored.reference.clone(),
        file_type,
        file_size: i64::try_from(stored.size).unwrap_or(i64::MAX),
        owner_id: user.id,
    };
    let record = match registry.insert(&new_file).await {
        Ok(record) => record,
        Err(e) => {
            storage.discard(&stored.reference).await;
            return Err(AppError::Internal("Error uploading file", e.to_string()));
        }
    };

    info!(
        file_id = record.id,
        owner = %user.username,
        size = record.file_size,
        "file uploaded"
    );
    Ok(FileUploadResponse {
        file_path: record.file_path,
        file_id: record.id,
    })
}

/// Issue a temporary retrieval link for a registered file.
///
/// Role is checked before the id is looked up. Any client-role identity may
/// fetch any file id; there is no ownership filter.
pub async fn download(
    registry: &dyn FileRegistry,
    storage: &StorageResolver,
    user: &Identity,
    file_id: i64,
) -> AppResult<FileDownloadResponse> {
    authorize(Operation::Download, Some(user.role)).map_err(|e| {
        warn!(username = %user.username, role = %user.role, file_id, "download denied");
        AppError::from(e)
    })?;

    let record = registry
        .find_by_id(file_id)
        .await?
        .ok_or(FileError::NotFound(file_id))?;

    let download_url = storage.temporary_link(&record.file_path).await?;
    info!(file_id, requester = %user.username, "download link issued");

    Ok(FileDownloadResponse {
        download_url,
        file_name: record.file_name,
    })
}
