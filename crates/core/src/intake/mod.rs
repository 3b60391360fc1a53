//! File intake: staging, the in-memory queue and resource handles.

mod queue;
mod resource;
mod staging;
mod types;

pub use queue::IntakeQueue;
pub use resource::{ResourceHandle, ResourceStore};
pub use staging::{
    validate_sizes, PendingSelection, SelectionError, SelectionStore, StagedFile, StagedFileInfo,
};
pub use types::{FileMeta, FilePayload, IntakeError, IntakeSummary, UploadedFile};
