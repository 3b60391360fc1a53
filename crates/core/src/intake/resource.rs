//! Revocable byte handles for submitted payloads.
//!
//! A [`ResourceHandle`] is the only way to reach the bytes of a live record.
//! It is not `Clone`; [`ResourceHandle::release`] consumes it and `Drop`
//! releases any handle that was never released explicitly, so each handle
//! is released exactly once on every removal path.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;
use uuid::Uuid;

use crate::metrics::RESOURCE_HANDLES_LIVE;

#[derive(Debug, Default)]
struct StoreInner {
    blobs: Mutex<HashMap<String, Bytes>>,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl StoreInner {
    fn release(&self, key: &str) {
        let removed = self
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        if removed.is_some() {
            self.released.fetch_add(1, Ordering::SeqCst);
            RESOURCE_HANDLES_LIVE.dec();
            trace!(key, "Released resource handle");
        }
    }
}

/// Allocator for resource handles.
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    inner: Arc<StoreInner>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `bytes` and hand back the handle that guards them.
    pub fn acquire(&self, bytes: Bytes) -> ResourceHandle {
        let key = format!("blob:{}", Uuid::new_v4());
        self.inner
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), bytes);
        self.inner.acquired.fetch_add(1, Ordering::SeqCst);
        RESOURCE_HANDLES_LIVE.inc();

        ResourceHandle {
            key,
            store: Arc::clone(&self.inner),
        }
    }

    /// Bytes behind `key`, or `None` once the handle is released.
    pub fn read(&self, key: &str) -> Option<Bytes> {
        self.inner
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of handles currently live.
    pub fn live_count(&self) -> usize {
        self.inner
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn acquired_count(&self) -> u64 {
        self.inner.acquired.load(Ordering::SeqCst)
    }

    pub fn released_count(&self) -> u64 {
        self.inner.released.load(Ordering::SeqCst)
    }
}

/// Exclusive, revocable access to one payload.
#[derive(Debug)]
pub struct ResourceHandle {
    key: String,
    store: Arc<StoreInner>,
}

impl ResourceHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn read(&self) -> Option<Bytes> {
        self.store
            .blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.key)
            .cloned()
    }

    /// Revoke access. The actual work happens in `Drop`.
    pub fn release(self) {}
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.store.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_read() {
        let store = ResourceStore::new();
        let handle = store.acquire(Bytes::from_static(b"%PDF-1.7"));

        assert!(handle.key().starts_with("blob:"));
        assert_eq!(handle.read().unwrap(), Bytes::from_static(b"%PDF-1.7"));
        assert_eq!(store.read(handle.key()).unwrap().len(), 8);
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn test_release_revokes_access_once() {
        let store = ResourceStore::new();
        let handle = store.acquire(Bytes::from_static(b"abc"));
        let key = handle.key().to_string();

        handle.release();

        assert!(store.read(&key).is_none());
        assert_eq!(store.live_count(), 0);
        assert_eq!(store.acquired_count(), 1);
        assert_eq!(store.released_count(), 1);
    }

    #[test]
    fn test_drop_releases_unreleased_handle() {
        let store = ResourceStore::new();
        {
            let _handle = store.acquire(Bytes::from_static(b"abc"));
            assert_eq!(store.live_count(), 1);
        }
        assert_eq!(store.live_count(), 0);
        assert_eq!(store.released_count(), 1);
    }

    #[test]
    fn test_keys_are_unique() {
        let store = ResourceStore::new();
        let a = store.acquire(Bytes::new());
        let b = store.acquire(Bytes::new());
        assert_ne!(a.key(), b.key());
        assert_eq!(store.live_count(), 2);
    }
}
