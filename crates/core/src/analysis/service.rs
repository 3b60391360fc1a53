//! Drives analysis requests against the intake queue.
//!
//! A request moves the record to `loading` immediately and runs the
//! classifier in the background. The outcome is written back only if the
//! record still exists and is still loading; otherwise it is dropped.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::intake::{IntakeQueue, UploadedFile};
use crate::metrics::{ANALYSIS_DURATION, ANALYSIS_REQUESTS};

use super::classifier::{ClassificationRequest, Classifier, ClassifierError};
use super::types::{is_analyzable, AnalysisResult, TransitionError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Analysis is not configured")]
    NotConfigured,

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// What the owner dashboard needs to know about the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisCapability {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A request that has entered `loading`.
pub struct StartedAnalysis {
    pub record: UploadedFile,
    /// Resolves to the completed record, or `None` if the outcome was discarded.
    pub completion: JoinHandle<Option<UploadedFile>>,
}

#[derive(Clone)]
pub struct AnalysisService {
    queue: Arc<IntakeQueue>,
    classifier: Option<Arc<dyn Classifier>>,
}

impl AnalysisService {
    pub fn new(queue: Arc<IntakeQueue>, classifier: Option<Arc<dyn Classifier>>) -> Self {
        Self { queue, classifier }
    }

    pub fn is_available(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn capability(&self) -> AnalysisCapability {
        match &self.classifier {
            Some(c) => AnalysisCapability {
                enabled: true,
                provider: Some(c.provider().to_string()),
                model: Some(c.model().to_string()),
            },
            None => AnalysisCapability {
                enabled: false,
                provider: None,
                model: None,
            },
        }
    }

    /// Start analysis of `id` and run the classifier in a background task.
    pub async fn request(&self, id: &str) -> Result<StartedAnalysis, AnalysisError> {
        let (record, classifier, request) = self.begin(id).await?;

        let service = self.clone();
        let task_id = id.to_string();
        let completion =
            tokio::spawn(async move { service.run(&task_id, classifier, request).await });

        Ok(StartedAnalysis { record, completion })
    }

    /// Start analysis of `id` and wait for the outcome.
    pub async fn analyze(&self, id: &str) -> Result<Option<UploadedFile>, AnalysisError> {
        let (_, classifier, request) = self.begin(id).await?;
        Ok(self.run(id, classifier, request).await)
    }

    /// Apply a classifier outcome to a loading record.
    ///
    /// Returns `None` when the record was evicted or is no longer loading,
    /// in which case nothing is changed.
    pub async fn complete(
        &self,
        id: &str,
        outcome: Result<AnalysisResult, ClassifierError>,
    ) -> Option<UploadedFile> {
        let now = self.queue.clock().now();
        let (label, applied) = match outcome {
            Ok(result) => (
                "success",
                self.queue
                    .update(id, |r| r.analysis.succeed(result, now))
                    .await,
            ),
            Err(e) => {
                let message = format!("Failed to analyze file: {}", e);
                (
                    "error",
                    self.queue.update(id, |r| r.analysis.fail(message, now)).await,
                )
            }
        };

        match applied {
            Ok(Some(record)) => {
                ANALYSIS_REQUESTS.with_label_values(&[label]).inc();
                info!(id, outcome = label, "Analysis finished");
                Some(record)
            }
            Ok(None) => {
                ANALYSIS_REQUESTS.with_label_values(&["discarded"]).inc();
                debug!(id, "File gone before analysis finished, outcome discarded");
                None
            }
            Err(e) => {
                ANALYSIS_REQUESTS.with_label_values(&["discarded"]).inc();
                warn!(id, error = %e, "Analysis outcome discarded");
                None
            }
        }
    }

    async fn begin(
        &self,
        id: &str,
    ) -> Result<(UploadedFile, Arc<dyn Classifier>, ClassificationRequest), AnalysisError> {
        let classifier = self
            .classifier
            .clone()
            .ok_or(AnalysisError::NotConfigured)?;

        let (meta, bytes) = self
            .queue
            .read_content(id)
            .await
            .ok_or_else(|| AnalysisError::NotFound(id.to_string()))?;

        let now = self.queue.clock().now();
        let record = self
            .queue
            .update(id, |r| {
                if !is_analyzable(&r.file.mime_type) {
                    return Err(TransitionError::Ineligible(r.file.mime_type.clone()));
                }
                r.analysis.begin(now)
            })
            .await?
            .ok_or_else(|| AnalysisError::NotFound(id.to_string()))?;

        ANALYSIS_REQUESTS.with_label_values(&["started"]).inc();
        info!(
            id,
            name = %meta.name,
            mime_type = %meta.mime_type,
            provider = classifier.provider(),
            "Analysis started"
        );

        Ok((record, classifier, ClassificationRequest::new(meta.mime_type, bytes)))
    }

    async fn run(
        &self,
        id: &str,
        classifier: Arc<dyn Classifier>,
        request: ClassificationRequest,
    ) -> Option<UploadedFile> {
        let timer = ANALYSIS_DURATION.start_timer();
        let outcome = classifier.classify(request).await;
        timer.observe_duration();

        if let Err(e) = &outcome {
            warn!(id, error = %e, "Classifier call failed");
        }
        self.complete(id, outcome).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisState;
    use crate::clock::ManualClock;
    use crate::intake::FilePayload;
    use crate::testing::MockClassifier;
    use chrono::{TimeZone, Utc};

    fn setup(classifier: Option<Arc<MockClassifier>>) -> (Arc<IntakeQueue>, AnalysisService) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap(),
        ));
        let queue = Arc::new(IntakeQueue::new(clock));
        let service = AnalysisService::new(
            queue.clone(),
            classifier.map(|c| c as Arc<dyn Classifier>),
        );
        (queue, service)
    }

    async fn submit(queue: &IntakeQueue, name: &str, mime: &str) -> String {
        queue
            .submit(vec![FilePayload::new(name, mime, b"data".to_vec())])
            .await
            .remove(0)
            .id
    }

    #[tokio::test]
    async fn test_capability() {
        let (_, service) = setup(None);
        assert!(!service.is_available());
        assert_eq!(
            service.capability(),
            AnalysisCapability {
                enabled: false,
                provider: None,
                model: None
            }
        );

        let (_, service) = setup(Some(Arc::new(MockClassifier::new())));
        let capability = service.capability();
        assert!(capability.enabled);
        assert_eq!(capability.provider.as_deref(), Some("mock"));
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let classifier = Arc::new(MockClassifier::new());
        let expected = AnalysisResult {
            page_count: Some(1),
            has_color: Some(true),
            image_quality: Some("High".to_string()),
            document_type: Some("Photo".to_string()),
            document_content_summary: Some("A landscape photo.".to_string()),
            file_extension: Some("JPG".to_string()),
        };
        classifier.push_result(expected.clone()).await;
        let (queue, service) = setup(Some(classifier.clone()));
        let id = submit(&queue, "photo.jpg", "image/jpeg").await;

        let record = service.analyze(&id).await.unwrap().unwrap();

        assert_eq!(record.analysis.result(), Some(&expected));
        assert_eq!(queue.get(&id).await.unwrap(), record);

        let requests = classifier.recorded_requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_analyze_failure_records_message() {
        let classifier = Arc::new(MockClassifier::new());
        classifier
            .set_next_error(ClassifierError::Http("connection reset".to_string()))
            .await;
        let (queue, service) = setup(Some(classifier));
        let id = submit(&queue, "scan.pdf", "application/pdf").await;

        let record = service.analyze(&id).await.unwrap().unwrap();

        assert_eq!(
            record.analysis.error_message(),
            Some("Failed to analyze file: HTTP error: connection reset")
        );
    }

    #[tokio::test]
    async fn test_request_rejections() {
        let (queue, service) = setup(None);
        let id = submit(&queue, "a.pdf", "application/pdf").await;
        assert_eq!(service.request(&id).await.err(), Some(AnalysisError::NotConfigured));

        let (queue, service) = setup(Some(Arc::new(MockClassifier::new())));
        let doc = submit(
            &queue,
            "notes.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        )
        .await;
        assert!(matches!(
            service.request(&doc).await.err(),
            Some(AnalysisError::Transition(TransitionError::Ineligible(_)))
        ));
        assert_eq!(queue.get(&doc).await.unwrap().analysis, AnalysisState::Absent);

        assert_eq!(
            service.request("missing").await.err(),
            Some(AnalysisError::NotFound("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_second_request_while_loading_is_refused() {
        let classifier = Arc::new(MockClassifier::new());
        classifier.hold().await;
        let (queue, service) = setup(Some(classifier.clone()));
        let id = submit(&queue, "a.png", "image/png").await;

        let started = service.request(&id).await.unwrap();
        assert!(started.record.analysis.is_loading());
        assert_eq!(
            service.request(&id).await.err(),
            Some(AnalysisError::Transition(TransitionError::AlreadyLoading))
        );

        classifier.release().await;
        let record = started.completion.await.unwrap().unwrap();
        assert_eq!(record.analysis.state_type(), "success");
        assert_eq!(
            service.request(&id).await.err(),
            Some(AnalysisError::Transition(TransitionError::AlreadyAnalyzed))
        );
    }

    #[tokio::test]
    async fn test_retry_after_error() {
        let classifier = Arc::new(MockClassifier::new());
        classifier
            .set_next_error(ClassifierError::Timeout(std::time::Duration::from_secs(30)))
            .await;
        let (queue, service) = setup(Some(classifier));
        let id = submit(&queue, "a.png", "image/png").await;

        let failed = service.analyze(&id).await.unwrap().unwrap();
        assert_eq!(failed.analysis.state_type(), "error");

        let retried = service.analyze(&id).await.unwrap().unwrap();
        assert_eq!(retried.analysis.state_type(), "success");
    }

    #[tokio::test]
    async fn test_completion_after_clear_is_discarded() {
        let classifier = Arc::new(MockClassifier::new());
        classifier.hold().await;
        let (queue, service) = setup(Some(classifier.clone()));
        let id = submit(&queue, "a.png", "image/png").await;

        let started = service.request(&id).await.unwrap();
        assert_eq!(queue.clear_all().await, 1);

        classifier.release().await;
        assert!(started.completion.await.unwrap().is_none());
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_complete_without_loading_is_ignored() {
        let (queue, service) = setup(Some(Arc::new(MockClassifier::new())));
        let id = submit(&queue, "a.png", "image/png").await;

        assert!(service
            .complete(&id, Ok(AnalysisResult::default()))
            .await
            .is_none());
        assert_eq!(queue.get(&id).await.unwrap().analysis, AnalysisState::Absent);
    }
}
