use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use printdrop_core::{
    AnalysisError, IntakeError, SanitizedConfig, SelectionError, TransitionError,
};
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Names of the files that exceeded the size limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oversized: Option<Vec<String>>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            oversized: None,
        }),
    )
}

pub fn intake_error(e: IntakeError) -> ApiError {
    match e {
        IntakeError::Oversized { ref names, .. } => (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ErrorResponse {
                error: e.to_string(),
                oversized: Some(names.clone()),
            }),
        ),
        IntakeError::EmptySubmission => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

pub fn selection_error(e: SelectionError) -> ApiError {
    match e {
        SelectionError::NotFound(_) | SelectionError::FileNotFound(_) => {
            error_response(StatusCode::NOT_FOUND, e.to_string())
        }
        SelectionError::Intake(inner) => intake_error(inner),
    }
}

pub fn analysis_error(e: AnalysisError) -> ApiError {
    let status = match &e {
        AnalysisError::NotFound(_) => StatusCode::NOT_FOUND,
        AnalysisError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        AnalysisError::Transition(TransitionError::Ineligible(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AnalysisError::Transition(_) => StatusCode::CONFLICT,
    };
    error_response(status, e.to_string())
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
