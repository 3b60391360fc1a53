//! Content analysis: state machine, classifier clients and the service that
//! ties them to the intake queue.

mod classifier;
mod gemini;
mod service;
mod types;

pub use classifier::{ClassificationRequest, Classifier, ClassifierError, ANALYSIS_INSTRUCTION};
pub use gemini::GeminiClassifier;
pub use service::{AnalysisCapability, AnalysisError, AnalysisService, StartedAnalysis};
pub use types::{is_analyzable, AnalysisResult, AnalysisState, TransitionError};

use std::sync::Arc;
use tracing::info;

use crate::config::Config;

/// Build the configured classifier, or `None` when analysis is disabled.
pub fn create_classifier(config: &Config) -> Result<Option<Arc<dyn Classifier>>, ClassifierError> {
    let Some(analysis) = config.enabled_analysis() else {
        info!("Content analysis disabled: no API key configured");
        return Ok(None);
    };

    let classifier = GeminiClassifier::from_config(analysis)?;
    info!(
        provider = classifier.provider(),
        model = classifier.model(),
        "Content analysis enabled"
    );
    Ok(Some(Arc::new(classifier)))
}
