//! Document upload endpoint

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use std::path::Path;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::UploadResponse;

/// Multipart field carrying the document
const FILE_FIELD: &str = "file";

/// POST /upload - Index a PDF, replacing the current index
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let start = Instant::now();
    let mut multipart =
        multipart.map_err(|e| Error::BadRequest(format!("Expected multipart/form-data: {}", e)))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::BadRequest(format!("Failed to read '{}': {}", filename, e)))?;

        upload = Some((filename, data));
        break;
    }

    let (filename, data) = upload
        .ok_or_else(|| Error::BadRequest(format!("Missing multipart field '{}'", FILE_FIELD)))?;

    tracing::info!("Upload: {} ({} bytes)", filename, data.len());

    // Removed on drop, whichever way this handler exits.
    let temp = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".pdf")
        .tempfile_in(&state.config().storage.upload_dir)
        .map_err(|e| Error::Upload(format!("failed to create temporary file: {}", e)))?;

    tokio::fs::write(temp.path(), &data)
        .await
        .map_err(|e| Error::Upload(format!("failed to write '{}': {}", filename, e)))?;

    let index = state
        .pipeline()
        .run(&filename, temp.path())
        .await
        .map_err(Error::into_processing)?;

    state
        .store()
        .replace(index)
        .await
        .map_err(|e| Error::processing(format!("failed to persist index: {}", e)))?;

    drop(temp);

    tracing::info!("Upload of '{}' indexed in {:?}", filename, start.elapsed());

    Ok(Json(UploadResponse::uploaded(&filename)))
}
