//! File request handlers.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{FileDownloadResponse, FileUploadResponse};
use crate::services::files;

/// Multipart field carrying the document.
const FILE_FIELD: &str = "file";

/// `POST /upload` — store a document and register it. Operation role only.
pub async fn upload_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> AppResult<Json<FileUploadResponse>> {
    // Role is checked before the body is read.
    files::authorize_upload(&user.identity)?;

    let (file_name, content) = read_document(&mut multipart).await?;
    let resp = files::upload(
        &state.pool,
        &state.storage,
        &user.identity,
        &file_name,
        content,
    )
    .await?;
    Ok(Json(resp))
}

/// Read the `file` field: its name (extension-checked before the content is
/// read) and its bytes. The whole field is buffered, bounded by the route's
/// body limit.
pub async fn read_document(multipart: &mut Multipart) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("Uploaded file has no name".into()))?;
        files::check_file_type(&file_name)?;

        let content = field.bytes().await.map_err(multipart_error)?;
        return Ok((file_name, content.to_vec()));
    }

    Err(AppError::Validation(format!(
        "Missing multipart field '{FILE_FIELD}'"
    )))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(e.body_text())
    }
}

/// `GET /download/{file_id}` — issue a temporary link. Client role only.
pub async fn download_handler(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(file_id): Path<i64>,
) -> AppResult<Json<FileDownloadResponse>> {
    let resp = files::download(&state.pool, &state.storage, &user.identity, file_id).await?;
    Ok(Json(resp))
}
