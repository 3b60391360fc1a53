//! Customer-side staging before files are sent.
//!
//! Size validation happens here, before any resource handle exists. A
//! staging attempt is all-or-nothing.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::metrics::{FILES_REJECTED_TOTAL, SELECTIONS_EXPIRED_TOTAL};

use super::queue::IntakeQueue;
use super::types::{FileMeta, FilePayload, IntakeError, UploadedFile};

/// A file waiting in a selection.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub id: String,
    pub payload: FilePayload,
}

/// Listing entry for a staged file.
#[derive(Debug, Clone, Serialize)]
pub struct StagedFileInfo {
    pub id: String,
    #[serde(flatten)]
    pub file: FileMeta,
}

impl From<&StagedFile> for StagedFileInfo {
    fn from(staged: &StagedFile) -> Self {
        Self {
            id: staged.id.clone(),
            file: staged.payload.meta(),
        }
    }
}

/// Reject the whole batch if any payload is over `limit_bytes`, naming
/// every offender in input order.
pub fn validate_sizes(payloads: &[FilePayload], limit_bytes: u64) -> Result<(), IntakeError> {
    let names: Vec<String> = payloads
        .iter()
        .filter(|p| p.size_bytes > limit_bytes)
        .map(|p| p.name.clone())
        .collect();

    if names.is_empty() {
        Ok(())
    } else {
        Err(IntakeError::Oversized { names, limit_bytes })
    }
}

/// Files picked by a customer but not yet sent.
#[derive(Debug, Clone)]
pub struct PendingSelection {
    files: Vec<StagedFile>,
    max_file_size: u64,
}

impl PendingSelection {
    pub fn new(max_file_size: u64) -> Self {
        Self {
            files: Vec::new(),
            max_file_size,
        }
    }

    /// Validate and append. Nothing is admitted if any payload is too large.
    pub fn stage(
        &mut self,
        payloads: Vec<FilePayload>,
    ) -> Result<Vec<StagedFileInfo>, IntakeError> {
        if let Err(e) = validate_sizes(&payloads, self.max_file_size) {
            if let IntakeError::Oversized { names, .. } = &e {
                FILES_REJECTED_TOTAL.inc_by(names.len() as u64);
            }
            return Err(e);
        }

        let staged: Vec<StagedFile> = payloads
            .into_iter()
            .map(|payload| StagedFile {
                id: Uuid::new_v4().to_string(),
                payload,
            })
            .collect();
        let infos = staged.iter().map(StagedFileInfo::from).collect();
        self.files.extend(staged);
        Ok(infos)
    }

    /// Drop a staged file. No resource handle is involved yet.
    pub fn remove(&mut self, staged_id: &str) -> Option<StagedFile> {
        let index = self.files.iter().position(|f| f.id == staged_id)?;
        Some(self.files.remove(index))
    }

    pub fn files(&self) -> Vec<StagedFileInfo> {
        self.files.iter().map(StagedFileInfo::from).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Submit everything staged, in staging order, and empty the selection.
    pub async fn send(&mut self, queue: &IntakeQueue) -> Result<Vec<UploadedFile>, IntakeError> {
        if self.files.is_empty() {
            return Err(IntakeError::EmptySubmission);
        }

        let payloads = std::mem::take(&mut self.files)
            .into_iter()
            .map(|f| f.payload)
            .collect();
        Ok(queue.submit(payloads).await)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Selection not found: {0}")]
    NotFound(String),

    #[error("Staged file not found: {0}")]
    FileNotFound(String),

    #[error(transparent)]
    Intake(#[from] IntakeError),
}

/// A selection plus the time it was opened.
struct OpenSelection {
    selection: PendingSelection,
    opened_at: DateTime<Utc>,
}

/// Open selections keyed by id.
///
/// Selections that are never sent are dropped by [`SelectionStore::sweep`]
/// together with their staged bytes.
pub struct SelectionStore {
    selections: RwLock<HashMap<String, OpenSelection>>,
    max_file_size: u64,
    clock: Arc<dyn Clock>,
}

impl SelectionStore {
    pub fn new(max_file_size: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            selections: RwLock::new(HashMap::new()),
            max_file_size,
            clock,
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub async fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let open = OpenSelection {
            selection: PendingSelection::new(self.max_file_size),
            opened_at: self.clock.now(),
        };
        self.selections.write().await.insert(id.clone(), open);
        debug!(selection_id = %id, "Created selection");
        id
    }

    pub async fn files(&self, id: &str) -> Result<Vec<StagedFileInfo>, SelectionError> {
        self.selections
            .read()
            .await
            .get(id)
            .map(|open| open.selection.files())
            .ok_or_else(|| SelectionError::NotFound(id.to_string()))
    }

    pub async fn stage(
        &self,
        id: &str,
        payloads: Vec<FilePayload>,
    ) -> Result<Vec<StagedFileInfo>, SelectionError> {
        let mut selections = self.selections.write().await;
        let open = selections
            .get_mut(id)
            .ok_or_else(|| SelectionError::NotFound(id.to_string()))?;
        Ok(open.selection.stage(payloads)?)
    }

    pub async fn remove_file(&self, id: &str, staged_id: &str) -> Result<(), SelectionError> {
        let mut selections = self.selections.write().await;
        let open = selections
            .get_mut(id)
            .ok_or_else(|| SelectionError::NotFound(id.to_string()))?;
        open.selection
            .remove(staged_id)
            .map(|_| ())
            .ok_or_else(|| SelectionError::FileNotFound(staged_id.to_string()))
    }

    /// Send the selection's files to `queue`. The selection is discarded on
    /// success and kept when empty.
    pub async fn send(
        &self,
        id: &str,
        queue: &IntakeQueue,
    ) -> Result<Vec<UploadedFile>, SelectionError> {
        let mut selections = self.selections.write().await;
        let open = selections
            .get_mut(id)
            .ok_or_else(|| SelectionError::NotFound(id.to_string()))?;
        let records = open.selection.send(queue).await?;
        selections.remove(id);
        drop(selections);

        info!(selection_id = %id, count = records.len(), "Selection sent");
        Ok(records)
    }

    /// Drop selections opened at least `retention` before `now`, staged
    /// files included. Returns the number dropped.
    pub async fn sweep(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let mut selections = self.selections.write().await;
        let before = selections.len();
        selections.retain(|_, open| now - open.opened_at < retention);
        let count = before - selections.len();
        drop(selections);

        if count > 0 {
            SELECTIONS_EXPIRED_TOTAL.inc_by(count as u64);
            info!(count, "Dropped abandoned selections");
        }
        count
    }

    pub async fn len(&self) -> usize {
        self.selections.read().await.len()
    }
}
