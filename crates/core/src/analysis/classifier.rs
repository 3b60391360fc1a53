//! Content classifier abstraction.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use std::time::Duration;

use super::types::AnalysisResult;

/// Instruction sent with every file.
pub const ANALYSIS_INSTRUCTION: &str = "Analyze this file for printing. Determine the page count, \
whether it contains color, the overall quality, its document type (e.g. Invoice, Resume, Photo), \
its file extension (e.g. PDF, JPG) and a one-sentence summary of its content. For single images \
the page count is 1. Respond in the requested JSON format.";

/// Error type for classifier calls.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Empty response from classifier")]
    EmptyResponse,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Not configured")]
    NotConfigured,
}

/// One file to classify.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub mime_type: String,
    pub data: Bytes,
    pub instruction: String,
}

impl ClassificationRequest {
    pub fn new(mime_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
            instruction: ANALYSIS_INSTRUCTION.to_string(),
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Payload as standard base64, the form the remote API expects.
    pub fn base64_data(&self) -> String {
        general_purpose::STANDARD.encode(&self.data)
    }
}

/// External service that inspects a payload and describes it.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Provider name (e.g., "gemini")
    fn provider(&self) -> &str;

    /// Model name (e.g., "gemini-2.5-flash")
    fn model(&self) -> &str;

    async fn classify(&self, request: ClassificationRequest)
        -> Result<AnalysisResult, ClassifierError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_to_standard_instruction() {
        let request = ClassificationRequest::new("image/png", Bytes::from_static(b"png"));
        assert_eq!(request.instruction, ANALYSIS_INSTRUCTION);
        assert_eq!(request.base64_data(), "cG5n");
    }

    #[test]
    fn test_custom_instruction() {
        let request = ClassificationRequest::new("application/pdf", Bytes::new())
            .with_instruction("Count the pages.");
        assert_eq!(request.instruction, "Count the pages.");
        assert_eq!(request.base64_data(), "");
    }

    #[test]
    fn test_error_display() {
        let err = ClassifierError::Api {
            status: 429,
            message: "Resource exhausted".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 429 - Resource exhausted");
        assert_eq!(ClassifierError::NotConfigured.to_string(), "Not configured");
    }
}
