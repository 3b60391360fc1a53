//! In-memory intake queue.
//!
//! Every mutation (submit, update, clear, sweep) runs entirely under the
//! write lock, so readers only ever observe whole-collection states and the
//! sweeper and `clear_all` can never release the same handle.

use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::{AnalysisState, TransitionError};
use crate::clock::Clock;
use crate::metrics::{FILES_CLEARED_TOTAL, FILES_EXPIRED_TOTAL, FILES_SUBMITTED_TOTAL};

use super::resource::{ResourceHandle, ResourceStore};
use super::types::{FileMeta, FilePayload, IntakeSummary, UploadedFile};

/// A live record and the handle that owns its bytes.
struct Entry {
    record: UploadedFile,
    handle: ResourceHandle,
}

impl Entry {
    /// Release the handle, then drop the record.
    fn destroy(self) {
        let Entry { record, handle } = self;
        handle.release();
        drop(record);
    }
}

pub struct IntakeQueue {
    entries: RwLock<Vec<Entry>>,
    resources: ResourceStore,
    clock: Arc<dyn Clock>,
}

impl IntakeQueue {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_resources(clock, ResourceStore::new())
    }

    pub fn with_resources(clock: Arc<dyn Clock>, resources: ResourceStore) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            resources,
            clock,
        }
    }

    pub fn resources(&self) -> &ResourceStore {
        &self.resources
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Append `files` in order, each with a fresh id and resource handle.
    pub async fn submit(&self, files: Vec<FilePayload>) -> Vec<UploadedFile> {
        if files.is_empty() {
            return Vec::new();
        }

        let now = self.clock.now();
        let new_entries: Vec<Entry> = files
            .into_iter()
            .map(|payload| {
                let meta = payload.meta();
                let handle = self.resources.acquire(payload.bytes);
                Entry {
                    record: UploadedFile {
                        id: Uuid::new_v4().to_string(),
                        file: meta,
                        resource: handle.key().to_string(),
                        created_at: now,
                        analysis: AnalysisState::Absent,
                    },
                    handle,
                }
            })
            .collect();

        let records: Vec<UploadedFile> = new_entries.iter().map(|e| e.record.clone()).collect();

        let mut entries = self.entries.write().await;
        entries.extend(new_entries);
        let total = entries.len();
        drop(entries);

        FILES_SUBMITTED_TOTAL.inc_by(records.len() as u64);
        info!(count = records.len(), total, "Files submitted to intake queue");
        records
    }

    /// Replace the record matching `id` with one carrying the analysis state
    /// produced by `patch`.
    ///
    /// Returns `Ok(None)` without calling `patch` when the record is gone,
    /// which is how completions for evicted records are discarded. When
    /// `patch` refuses, the record is left untouched.
    pub async fn update<F>(
        &self,
        id: &str,
        patch: F,
    ) -> Result<Option<UploadedFile>, TransitionError>
    where
        F: FnOnce(&UploadedFile) -> Result<AnalysisState, TransitionError>,
    {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.iter_mut().find(|e| e.record.id == id) else {
            debug!(id, "Update for unknown file ignored");
            return Ok(None);
        };

        let analysis = patch(&entry.record)?;
        entry.record = entry.record.with_analysis(analysis);
        Ok(Some(entry.record.clone()))
    }

    /// Release every handle and empty the queue. Returns how many records
    /// were removed.
    pub async fn clear_all(&self) -> usize {
        let mut entries = self.entries.write().await;
        let removed = std::mem::take(&mut *entries);
        let count = removed.len();
        removed.into_iter().for_each(Entry::destroy);
        drop(entries);

        if count > 0 {
            FILES_CLEARED_TOTAL.inc_by(count as u64);
            info!(count, "Cleared intake queue");
        }
        count
    }

    /// Evict records with `now - created_at >= retention`. Returns the
    /// number evicted.
    pub async fn sweep(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let (fresh, expired): (Vec<Entry>, Vec<Entry>) = std::mem::take(&mut *entries)
            .into_iter()
            .partition(|e| now - e.record.created_at < retention);
        *entries = fresh;

        let count = expired.len();
        for entry in expired {
            debug!(id = %entry.record.id, name = %entry.record.file.name, "Evicting expired file");
            entry.destroy();
        }
        drop(entries);

        if count > 0 {
            FILES_EXPIRED_TOTAL.inc_by(count as u64);
            info!(count, "Evicted expired files");
        }
        count
    }

    pub async fn get(&self, id: &str) -> Option<UploadedFile> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.record.id == id)
            .map(|e| e.record.clone())
    }

    /// Payload metadata and bytes of a live record.
    pub async fn read_content(&self, id: &str) -> Option<(FileMeta, Bytes)> {
        let entries = self.entries.read().await;
        let entry = entries.iter().find(|e| e.record.id == id)?;
        let bytes = entry.handle.read()?;
        Some((entry.record.file.clone(), bytes))
    }

    /// All records, newest first. Records with equal timestamps keep
    /// submission order.
    pub async fn list(&self) -> Vec<UploadedFile> {
        let mut records: Vec<UploadedFile> = self
            .entries
            .read()
            .await
            .iter()
            .map(|e| e.record.clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Records created on the same calendar day as `now` in `tz`.
    pub async fn count_same_day<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> usize {
        let today = now.with_timezone(tz).date_naive();
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.record.created_at.with_timezone(tz).date_naive() == today)
            .count()
    }

    pub async fn summary<Tz: TimeZone>(&self, now: DateTime<Utc>, tz: &Tz) -> IntakeSummary {
        let files = self.list().await;
        let today_date = now.with_timezone(tz).date_naive();
        let today = files
            .iter()
            .filter(|f| f.created_at.with_timezone(tz).date_naive() == today_date)
            .count();

        IntakeSummary {
            total: files.len(),
            today,
            files,
        }
    }
}
