//! Mock classifier for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, RwLock};

use crate::analysis::{AnalysisResult, ClassificationRequest, Classifier, ClassifierError};

/// A recorded classification for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedClassification {
    pub mime_type: String,
    pub size_bytes: usize,
    pub timestamp: Instant,
}

/// Mock implementation of the Classifier trait.
///
/// Provides controllable behavior for testing:
/// - Return queued results, or a default photo description
/// - Fail the next call with a given error
/// - Hold calls in flight until released
///
/// # Example
///
/// ```rust,ignore
/// use printdrop_core::testing::MockClassifier;
///
/// let classifier = MockClassifier::new();
/// classifier.hold().await;
///
/// // start an analysis, observe `loading`, then:
/// classifier.release().await;
/// ```
pub struct MockClassifier {
    /// Results returned in order; the default result is used when empty.
    results: Arc<RwLock<VecDeque<AnalysisResult>>>,
    /// Recorded calls.
    requests: Arc<RwLock<Vec<RecordedClassification>>>,
    /// If set, the next call will fail with this error.
    next_error: Arc<RwLock<Option<ClassifierError>>>,
    /// Calls wait while this is `false`.
    gate: watch::Sender<bool>,
}

impl std::fmt::Debug for MockClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClassifier")
            .field("results", &"<results>")
            .field("requests", &"<requests>")
            .field("next_error", &"<next_error>")
            .field("open", &*self.gate.borrow())
            .finish()
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClassifier {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            results: Arc::new(RwLock::new(VecDeque::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            gate,
        }
    }

    /// The result returned when nothing is queued.
    pub fn default_result() -> AnalysisResult {
        AnalysisResult {
            page_count: Some(1),
            has_color: Some(true),
            image_quality: Some("High".to_string()),
            document_type: Some("Photo".to_string()),
            document_content_summary: Some("A test image.".to_string()),
            file_extension: Some("JPG".to_string()),
        }
    }

    pub async fn push_result(&self, result: AnalysisResult) {
        self.results.write().await.push_back(result);
    }

    pub async fn set_next_error(&self, error: ClassifierError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make subsequent calls wait until `release` is called.
    pub async fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Let held and future calls proceed.
    pub async fn release(&self) {
        self.gate.send_replace(true);
    }

    pub async fn recorded_requests(&self) -> Vec<RecordedClassification> {
        self.requests.read().await.clone()
    }

    pub async fn clear_recorded(&self) {
        self.requests.write().await.clear();
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn classify(
        &self,
        request: ClassificationRequest,
    ) -> Result<AnalysisResult, ClassifierError> {
        self.requests.write().await.push(RecordedClassification {
            mime_type: request.mime_type.clone(),
            size_bytes: request.data.len(),
            timestamp: Instant::now(),
        });

        let mut gate = self.gate.subscribe();
        // sender is owned by self and outlives the call
        let _ = gate.wait_for(|open| *open).await;

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        Ok(self
            .results
            .write()
            .await
            .pop_front()
            .unwrap_or_else(Self::default_result))
    }
}
