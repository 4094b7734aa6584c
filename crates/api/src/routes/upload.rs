//! Upload, URL and delete routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Query, State, multipart::Field},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use depot_core::batch::{BatchOptions, upload_all};
use depot_core::storage::{FileInput, UploadDescriptor, Uploader};
use depot_shared::AppError;

use crate::{AppState, BodyLimits, MAX_FILES_PER_REQUEST};
use crate::error::ApiError;

/// Creates the upload routes.
///
/// The multi-file route carries its own body limit; per-file size is
/// enforced by the upload policy.
pub fn routes(limits: BodyLimits) -> Router<AppState> {
    Router::new()
        .route("/upload/file", post(upload_file).delete(delete_file))
        .route(
            "/upload/files",
            post(upload_files).layer(DefaultBodyLimit::max(limits.multi)),
        )
        .route("/upload/url", get(get_url))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for one stored file.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Public URL.
    pub url: String,
    /// Object key.
    pub key: String,
    /// Bytes stored.
    pub size: u64,
    /// Content type.
    pub mime_type: String,
    /// Filename as sent by the client.
    pub filename: String,
}

impl UploadResponse {
    fn new(descriptor: UploadDescriptor, filename: String) -> Self {
        Self {
            url: descriptor.url,
            key: descriptor.key,
            size: descriptor.size,
            mime_type: descriptor.mime_type,
            filename,
        }
    }
}

/// Response for a multi-file upload.
#[derive(Debug, Serialize)]
pub struct MultiUploadResponse {
    /// Files stored.
    pub success_count: usize,
    /// Files rejected or failed.
    pub error_count: usize,
    /// Stored files, in request order.
    pub results: Vec<UploadResponse>,
    /// One message per failed file.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Query for URL lookup.
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    /// Object key.
    #[serde(default)]
    pub key: String,
}

/// Response for URL lookup.
#[derive(Debug, Serialize)]
pub struct UrlResponse {
    /// Public URL.
    pub url: String,
    /// Object key.
    pub key: String,
}

/// Request body for deletion.
#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    /// Object key.
    #[serde(default)]
    pub key: String,
}

/// Response for deletion.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Object key.
    pub key: String,
    /// Always true on success.
    pub deleted: bool,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Buffer one multipart file field.
async fn read_file_field(field: Field<'_>) -> Result<FileInput, ApiError> {
    let filename = field
        .file_name()
        .map(ToString::to_string)
        .ok_or_else(|| AppError::BadRequest("multipart field has no filename".into()))?;
    let data = field.bytes().await?;
    Ok(FileInput::from_bytes(filename, data))
}

/// POST `/upload/file`
/// Store the multipart field `file`.
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let input = read_file_field(field).await?;
        let filename = input.filename().to_string();
        let descriptor = state.uploader.upload(input).await?;

        info!(key = %descriptor.key, filename = %filename, "File uploaded via API");
        return Ok(Json(UploadResponse::new(descriptor, filename)));
    }

    Err(AppError::BadRequest("multipart field 'file' is required".into()).into())
}

/// POST `/upload/files`
/// Store every multipart field named `files`.
async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MultiUploadResponse>, ApiError> {
    let mut inputs = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("files") {
            continue;
        }
        if inputs.len() == MAX_FILES_PER_REQUEST {
            return Err(AppError::BadRequest(format!(
                "at most {MAX_FILES_PER_REQUEST} files per request"
            ))
            .into());
        }
        inputs.push(read_file_field(field).await?);
    }

    if inputs.is_empty() {
        return Err(AppError::BadRequest("no files to upload".into()).into());
    }

    let mut report = upload_all(Arc::clone(&state.uploader), inputs, BatchOptions::default())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    report.outcomes.sort_by_key(|o| o.index);

    let mut results = Vec::new();
    let mut errors = Vec::new();
    for outcome in report.outcomes {
        match outcome.result {
            Ok(descriptor) => results.push(UploadResponse::new(descriptor, outcome.filename)),
            Err(e) => errors.push(format!("{}: {e}", outcome.filename)),
        }
    }

    info!(
        success_count = results.len(),
        error_count = errors.len(),
        "Multi-file upload via API"
    );

    Ok(Json(MultiUploadResponse {
        success_count: results.len(),
        error_count: errors.len(),
        results,
        errors,
    }))
}

/// GET `/upload/url?key=`
async fn get_url(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<UrlResponse>, ApiError> {
    let url = state.uploader.url(&query.key)?;
    Ok(Json(UrlResponse {
        url,
        key: query.key,
    }))
}

/// DELETE `/upload/file`
async fn delete_file(
    State(state): State<AppState>,
    Json(payload): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.uploader.delete(&payload.key).await?;
    Ok(Json(DeleteResponse {
        key: payload.key,
        deleted: true,
    }))
}
