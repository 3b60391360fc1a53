pub mod analysis;
pub mod auth;
pub mod clock;
pub mod config;
pub mod intake;
pub mod metrics;
pub mod sweeper;
pub mod testing;

pub use analysis::{
    create_classifier, is_analyzable, AnalysisCapability, AnalysisError, AnalysisResult,
    AnalysisService, AnalysisState, ClassificationRequest, Classifier, ClassifierError,
    GeminiClassifier, StartedAnalysis, TransitionError,
};
pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    load_config, load_config_from_str, validate_config, AnalysisConfig, AuthConfig, AuthMethod,
    Config, ConfigError, IntakeConfig, SanitizedConfig, ServerConfig,
};
pub use intake::{
    validate_sizes, FileMeta, FilePayload, IntakeError, IntakeQueue, IntakeSummary,
    PendingSelection, ResourceHandle, ResourceStore, SelectionError, SelectionStore, StagedFile,
    StagedFileInfo, UploadedFile,
};
pub use sweeper::ExpirySweeper;
