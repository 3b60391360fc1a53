//! Analysis state machine types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured description returned by the classifier.
///
/// Every field is optional: the classifier may omit any of them and callers
/// must not assume presence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_color: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_quality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_content_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
}

/// Per-record analysis state.
///
/// `Success` always carries a result and `Error` always carries a message;
/// no state carries both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AnalysisState {
    #[default]
    Absent,
    Loading {
        started_at: DateTime<Utc>,
    },
    Success {
        result: AnalysisResult,
        completed_at: DateTime<Utc>,
    },
    Error {
        message: String,
        completed_at: DateTime<Utc>,
    },
}

/// Refused state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Analysis already in progress")]
    AlreadyLoading,

    #[error("File has already been analyzed")]
    AlreadyAnalyzed,

    #[error("No analysis in progress")]
    NotLoading,

    #[error("Files of type '{0}' cannot be analyzed")]
    Ineligible(String),
}

impl AnalysisState {
    pub fn state_type(&self) -> &'static str {
        match self {
            AnalysisState::Absent => "absent",
            AnalysisState::Loading { .. } => "loading",
            AnalysisState::Success { .. } => "success",
            AnalysisState::Error { .. } => "error",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, AnalysisState::Loading { .. })
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            AnalysisState::Success { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            AnalysisState::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// `absent -> loading`, or a user-triggered retry `error -> loading`.
    pub fn begin(&self, at: DateTime<Utc>) -> Result<AnalysisState, TransitionError> {
        match self {
            AnalysisState::Absent | AnalysisState::Error { .. } => {
                Ok(AnalysisState::Loading { started_at: at })
            }
            AnalysisState::Loading { .. } => Err(TransitionError::AlreadyLoading),
            AnalysisState::Success { .. } => Err(TransitionError::AlreadyAnalyzed),
        }
    }

    /// `loading -> success`.
    pub fn succeed(
        &self,
        result: AnalysisResult,
        at: DateTime<Utc>,
    ) -> Result<AnalysisState, TransitionError> {
        match self {
            AnalysisState::Loading { .. } => Ok(AnalysisState::Success {
                result,
                completed_at: at,
            }),
            _ => Err(TransitionError::NotLoading),
        }
    }

    /// `loading -> error`.
    pub fn fail(
        &self,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<AnalysisState, TransitionError> {
        match self {
            AnalysisState::Loading { .. } => Ok(AnalysisState::Error {
                message: message.into(),
                completed_at: at,
            }),
            _ => Err(TransitionError::NotLoading),
        }
    }
}

/// Whether a declared media type can be sent to the classifier at all:
/// images and PDF documents.
pub fn is_analyzable(mime_type: &str) -> bool {
    let essence = mime_type.split(';').next().unwrap_or_default();
    let mime = essence.trim().to_ascii_lowercase();
    mime.starts_with("image/") || mime == "application/pdf"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo_result() -> AnalysisResult {
        AnalysisResult {
            page_count: Some(1),
            has_color: Some(true),
            image_quality: Some("High".to_string()),
            document_type: Some("Photo".to_string()),
            document_content_summary: Some("A landscape photo.".to_string()),
            file_extension: Some("JPG".to_string()),
        }
    }

    #[test]
    fn test_happy_path() {
        let now = Utc::now();
        let loading = AnalysisState::Absent.begin(now).unwrap();
        assert!(loading.is_loading());

        let done = loading.succeed(photo_result(), now).unwrap();
        assert_eq!(done.state_type(), "success");
        assert_eq!(done.result(), Some(&photo_result()));
        assert!(done.error_message().is_none());
    }

    #[test]
    fn test_failure_path() {
        let now = Utc::now();
        let failed = AnalysisState::Absent
            .begin(now)
            .unwrap()
            .fail("Failed to analyze file: boom", now)
            .unwrap();
        assert_eq!(failed.error_message(), Some("Failed to analyze file: boom"));
        assert!(failed.result().is_none());
    }

    #[test]
    fn test_illegal_transitions() {
        let now = Utc::now();
        assert_eq!(
            AnalysisState::Absent.succeed(photo_result(), now),
            Err(TransitionError::NotLoading)
        );
        assert_eq!(
            AnalysisState::Absent.fail("x", now),
            Err(TransitionError::NotLoading)
        );

        let loading = AnalysisState::Loading { started_at: now };
        assert_eq!(loading.begin(now), Err(TransitionError::AlreadyLoading));

        let success = loading.succeed(photo_result(), now).unwrap();
        assert_eq!(success.begin(now), Err(TransitionError::AlreadyAnalyzed));
        assert_eq!(success.fail("x", now), Err(TransitionError::NotLoading));
    }

    #[test]
    fn test_retry_from_error() {
        let now = Utc::now();
        let failed = AnalysisState::Error {
            message: "timeout".to_string(),
            completed_at: now,
        };
        assert!(failed.begin(now).unwrap().is_loading());
    }

    #[test]
    fn test_result_uses_camel_case_fields() {
        let json = serde_json::to_value(photo_result()).unwrap();
        assert_eq!(json["pageCount"], 1);
        assert_eq!(json["hasColor"], true);
        assert_eq!(json["imageQuality"], "High");
        assert_eq!(json["documentType"], "Photo");
        assert_eq!(json["documentContentSummary"], "A landscape photo.");
        assert_eq!(json["fileExtension"], "JPG");
    }

    #[test]
    fn test_partial_result_parses() {
        let result: AnalysisResult =
            serde_json::from_str(r#"{"documentType":"Invoice"}"#).unwrap();
        assert_eq!(result.document_type.as_deref(), Some("Invoice"));
        assert!(result.page_count.is_none());
        assert!(result.has_color.is_none());
    }

    #[test]
    fn test_state_serialization_is_tagged() {
        let json = serde_json::to_value(AnalysisState::Absent).unwrap();
        assert_eq!(json["state"], "absent");

        let json = serde_json::to_value(AnalysisState::Error {
            message: "bad".to_string(),
            completed_at: Utc::now(),
        })
        .unwrap();
        assert_eq!(json["state"], "error");
        assert_eq!(json["message"], "bad");
    }

    #[test]
    fn test_is_analyzable() {
        assert!(is_analyzable("image/jpeg"));
        assert!(is_analyzable("image/png"));
        assert!(is_analyzable("application/pdf"));
        assert!(is_analyzable("Application/PDF"));
        assert!(!is_analyzable(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        ));
        assert!(!is_analyzable("text/plain"));
        assert!(!is_analyzable(""));
    }

    #[test]
    fn test_is_analyzable_ignores_parameters() {
        assert!(is_analyzable("application/pdf; name=x"));
        assert!(is_analyzable("application/pdf;charset=binary"));
        assert!(is_analyzable("image/png; q=0.9"));
        assert!(!is_analyzable("text/plain; charset=utf-8"));
        assert!(!is_analyzable("application/pdfx; name=x"));
    }
}
