//! Customer-facing upload handlers.
//!
//! Files are streamed field by field. A field that grows past the size limit
//! stops being buffered but keeps being counted, so the rejection can name
//! every offender without holding its bytes.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use printdrop_core::{FilePayload, PendingSelection, StagedFileInfo, UploadedFile};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::handlers::{error_response, intake_error, selection_error, ApiError};
use crate::state::AppState;

/// Declared type when the client sends none.
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

// ============================================================================
// Request/Response Types
// ============================================================================

/// A pending selection and its staged files
#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    pub id: String,
    pub files: Vec<StagedFileInfo>,
    pub max_file_size_bytes: u64,
}

/// Files just staged into a selection
#[derive(Debug, Serialize)]
pub struct StagedResponse {
    pub staged: Vec<StagedFileInfo>,
}

/// Records created by a send
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub files: Vec<UploadedFile>,
}

// ============================================================================
// Multipart parsing
// ============================================================================

fn multipart_error(e: MultipartError) -> ApiError {
    error_response(e.status(), e.body_text())
}

/// Read every file field of `multipart`, keeping the bytes of those within
/// `limit_bytes` and only the size of the rest.
async fn read_payloads(
    multipart: &mut Multipart,
    limit_bytes: u64,
) -> Result<Vec<FilePayload>, ApiError> {
    let mut payloads = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let mime_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        let mut data = Vec::new();
        let mut size: u64 = 0;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            size += chunk.len() as u64;
            if size <= limit_bytes {
                data.extend_from_slice(&chunk);
            } else if !data.is_empty() {
                data = Vec::new();
            }
        }

        if size > limit_bytes {
            debug!(name = %name, size, "Discarded bytes of oversized upload");
            payloads.push(FilePayload::oversized(name, mime_type, size));
        } else {
            payloads.push(FilePayload::new(name, mime_type, data));
        }
    }

    Ok(payloads)
}

// ============================================================================
// Handlers
// ============================================================================

/// Open a new selection
pub async fn create_selection(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SelectionResponse>) {
    let id = state.selections().create().await;
    (
        StatusCode::CREATED,
        Json(SelectionResponse {
            id,
            files: Vec::new(),
            max_file_size_bytes: state.selections().max_file_size(),
        }),
    )
}

/// List a selection's staged files
pub async fn get_selection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SelectionResponse>, ApiError> {
    let files = state.selections().files(&id).await.map_err(selection_error)?;
    Ok(Json(SelectionResponse {
        id,
        files,
        max_file_size_bytes: state.selections().max_file_size(),
    }))
}

/// Stage the uploaded files into a selection
pub async fn stage_files(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StagedResponse>), ApiError> {
    let payloads = read_payloads(&mut multipart, state.selections().max_file_size()).await?;
    let staged = state
        .selections()
        .stage(&id, payloads)
        .await
        .map_err(selection_error)?;

    debug!(selection_id = %id, count = staged.len(), "Files staged");
    Ok((StatusCode::CREATED, Json(StagedResponse { staged })))
}

/// Remove one staged file
pub async fn remove_staged_file(
    State(state): State<Arc<AppState>>,
    Path((id, file_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .selections()
        .remove_file(&id, &file_id)
        .await
        .map_err(selection_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Send a selection to the shop
pub async fn send_selection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let files = state
        .selections()
        .send(&id, state.queue())
        .await
        .map_err(selection_error)?;
    Ok((StatusCode::CREATED, Json(SubmitResponse { files })))
}

/// Stage and send in one request
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let limit = state.selections().max_file_size();
    let payloads = read_payloads(&mut multipart, limit).await?;

    let mut selection = PendingSelection::new(limit);
    selection.stage(payloads).map_err(intake_error)?;
    let files = selection.send(state.queue()).await.map_err(intake_error)?;

    info!(count = files.len(), "Direct upload received");
    Ok((StatusCode::CREATED, Json(SubmitResponse { files })))
}
