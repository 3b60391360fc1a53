//! Intake data types.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::AnalysisState;

/// Raw file as received from a customer.
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub name: String,
    /// Declared size. Validation uses this, not `bytes.len()`, so oversized
    /// uploads can be reported without buffering them.
    pub size_bytes: u64,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl FilePayload {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size_bytes: bytes.len() as u64,
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Payload whose bytes were discarded because it was too large to keep.
    pub fn oversized(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            mime_type: mime_type.into(),
            bytes: Bytes::new(),
        }
    }

    pub fn meta(&self) -> FileMeta {
        FileMeta {
            name: self.name.clone(),
            size_bytes: self.size_bytes,
            mime_type: self.mime_type.clone(),
        }
    }
}

/// File metadata kept on the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

/// A submitted file as seen by the shop owner.
///
/// Everything but `analysis` is fixed at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub file: FileMeta,
    /// Key of the resource handle guarding the bytes.
    pub resource: String,
    pub created_at: DateTime<Utc>,
    pub analysis: AnalysisState,
}

impl UploadedFile {
    /// Same record with a new analysis state.
    pub fn with_analysis(&self, analysis: AnalysisState) -> Self {
        Self {
            analysis,
            ..self.clone()
        }
    }
}

/// Counts and listing for the shop owner dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeSummary {
    pub total: usize,
    /// Files received on the current local calendar day.
    pub today: usize,
    /// Newest first.
    pub files: Vec<UploadedFile>,
}

/// Errors raised while staging or sending files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntakeError {
    #[error(
        "Files must be under {} MB. The following files are too large: {}",
        .limit_bytes / (1024 * 1024),
        .names.join(", ")
    )]
    Oversized { names: Vec<String>, limit_bytes: u64 },

    #[error("Please select at least one file to send.")]
    EmptySubmission,
}
