use printdrop_core::{
    AnalysisService, Authenticator, Classifier, Config, IntakeQueue, SanitizedConfig,
    SelectionStore,
};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    queue: Arc<IntakeQueue>,
    selections: Arc<SelectionStore>,
    analysis: AnalysisService,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        queue: Arc<IntakeQueue>,
        classifier: Option<Arc<dyn Classifier>>,
    ) -> Self {
        let selections = Arc::new(SelectionStore::new(
            config.intake.max_file_size_bytes,
            Arc::clone(queue.clock()),
        ));
        let analysis = AnalysisService::new(Arc::clone(&queue), classifier);
        Self {
            config,
            authenticator,
            queue,
            selections,
            analysis,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn queue(&self) -> &Arc<IntakeQueue> {
        &self.queue
    }

    pub fn selections(&self) -> &Arc<SelectionStore> {
        &self.selections
    }

    pub fn analysis(&self) -> &AnalysisService {
        &self.analysis
    }
}
