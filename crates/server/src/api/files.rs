//! Shop owner handlers: the received-files queue and analysis.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use printdrop_core::{AnalysisCapability, IntakeSummary, UploadedFile};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::handlers::{analysis_error, error_response, ApiError};
use super::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

fn file_not_found(id: &str) -> ApiError {
    error_response(StatusCode::NOT_FOUND, format!("File not found: {}", id))
}

/// `Content-Disposition` value with an ASCII fallback and the exact UTF-8 name.
pub fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(name)
    )
}

/// Counts plus every file, newest first
pub async fn list_files(State(state): State<Arc<AppState>>) -> Json<IntakeSummary> {
    let queue = state.queue();
    Json(queue.summary(queue.clock().now(), &Local).await)
}

/// Remove every file and release its storage
pub async fn clear_files(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Json<ClearResponse> {
    let cleared = state.queue().clear_all().await;
    info!(user_id = %user_id, cleared, "Queue cleared by owner");
    Json(ClearResponse { cleared })
}

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UploadedFile>, ApiError> {
    state
        .queue()
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| file_not_found(&id))
}

/// Download a file's bytes under its original name
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let (meta, bytes) = state
        .queue()
        .read_content(&id)
        .await
        .ok_or_else(|| file_not_found(&id))?;

    Ok((
        [
            (header::CONTENT_TYPE, meta.mime_type.clone()),
            (header::CONTENT_DISPOSITION, content_disposition(&meta.name)),
        ],
        bytes,
    )
        .into_response())
}

/// Start analysis; the record comes back in the `loading` state
pub async fn request_analysis(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<UploadedFile>), ApiError> {
    let started = state.analysis().request(&id).await.map_err(analysis_error)?;
    info!(user_id = %user_id, id = %id, "Analysis requested");
    Ok((StatusCode::ACCEPTED, Json(started.record)))
}

pub async fn analysis_capability(State(state): State<Arc<AppState>>) -> Json<AnalysisCapability> {
    Json(state.analysis().capability())
}
