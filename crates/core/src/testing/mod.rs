//! Testing utilities and mock implementations.
//!
//! This module provides a mock classifier and fixtures, allowing the intake
//! and analysis flows to be exercised without a remote model.
//!
//! # Example
//!
//! ```rust,ignore
//! use printdrop_core::testing::{fixtures, MockClassifier};
//!
//! let classifier = MockClassifier::new();
//! classifier.push_result(fixtures::invoice_result(2)).await;
//!
//! // Use in AppState...
//! ```

mod mock_classifier;

pub use mock_classifier::{MockClassifier, RecordedClassification};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::analysis::AnalysisResult;
    use crate::intake::FilePayload;

    pub const MIB: u64 = 1024 * 1024;

    /// A small PDF payload.
    pub fn pdf(name: &str) -> FilePayload {
        FilePayload::new(name, "application/pdf", b"%PDF-1.7\n%%EOF".to_vec())
    }

    /// A small JPEG payload.
    pub fn jpeg(name: &str) -> FilePayload {
        FilePayload::new(name, "image/jpeg", vec![0xff, 0xd8, 0xff, 0xe0, 0x00])
    }

    /// A Word document payload, which cannot be analyzed.
    pub fn docx(name: &str) -> FilePayload {
        FilePayload::new(
            name,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            b"PK\x03\x04".to_vec(),
        )
    }

    /// A payload that only declares its size.
    pub fn sized(name: &str, size_bytes: u64) -> FilePayload {
        FilePayload::oversized(name, "application/pdf", size_bytes)
    }

    /// Classifier answer for a multi-page invoice.
    pub fn invoice_result(pages: u32) -> AnalysisResult {
        AnalysisResult {
            page_count: Some(pages),
            has_color: Some(false),
            image_quality: Some("High".to_string()),
            document_type: Some("Invoice".to_string()),
            document_content_summary: Some("An invoice for printing services.".to_string()),
            file_extension: Some("PDF".to_string()),
        }
    }
}
