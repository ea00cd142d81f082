// SPDX-License-Identifier: GPL-3.0-or-later

//! Ordered download queue with at-most-once admission per `(kind, catalog_id)`.

use cratedigger_config::QueueConfig;
use cratedigger_domain::{Bitrate, CanonicalRelease, QueueItem, ReleaseKey};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Download parameters applied to every release admitted through the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDefaults {
    pub bitrate: Bitrate,
    pub download_path: PathBuf,
}

impl QueueDefaults {
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            bitrate: config.bitrate,
            download_path: config.download_path.clone(),
        }
    }

    pub fn item_for(&self, release: CanonicalRelease) -> QueueItem {
        QueueItem::new(release, self.bitrate, self.download_path.clone())
    }
}

impl Default for QueueDefaults {
    fn default() -> Self {
        Self::from_config(&QueueConfig::default())
    }
}

#[derive(Default)]
struct QueueState {
    items: Vec<QueueItem>,
    keys: HashSet<ReleaseKey>,
    duplicates: usize,
}

impl QueueState {
    fn insert(&mut self, item: QueueItem) -> bool {
        let key = item.key();
        if !self.keys.insert(key) {
            self.duplicates += 1;
            debug!(target: "queue", %key, "duplicate rejected");
            return false;
        }
        info!(target: "queue", %key, release = %item.release, bitrate = %item.bitrate, "queued");
        self.items.push(item);
        true
    }
}

/// Shared handle; clones see the same queue.
///
/// The duplicate check and the insert happen under one lock, so concurrent
/// workers resolving the same release produce a single entry.
#[derive(Clone, Default)]
pub struct ResolutionQueue {
    inner: Arc<Mutex<QueueState>>,
}

impl ResolutionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns false, leaving the existing entry untouched, when the release is already queued.
    pub fn enqueue(&self, release: CanonicalRelease, bitrate: Bitrate, download_path: impl Into<PathBuf>) -> bool {
        self.push(QueueItem::new(release, bitrate, download_path))
    }

    pub fn push(&self, item: QueueItem) -> bool {
        self.state().insert(item)
    }

    /// Bulk insert under a single lock. Returns how many items were new.
    pub fn extend(&self, items: impl IntoIterator<Item = QueueItem>) -> usize {
        let mut state = self.state();
        items.into_iter().filter(|item| state.insert(item.clone())).count()
    }

    pub fn remove(&self, index: usize) -> Option<QueueItem> {
        let mut state = self.state();
        if index >= state.items.len() {
            return None;
        }
        let item = state.items.remove(index);
        state.keys.remove(&item.key());
        debug!(target: "queue", key = %item.key(), "removed");
        Some(item)
    }

    pub fn clear(&self) {
        let mut state = self.state();
        state.items.clear();
        state.keys.clear();
        debug!(target: "queue", "cleared");
    }

    /// Snapshot in insertion order.
    pub fn list(&self) -> Vec<QueueItem> {
        self.state().items.clone()
    }

    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &ReleaseKey) -> bool {
        self.state().keys.contains(key)
    }

    /// Number of rejected duplicate insertions since creation.
    pub fn duplicate_count(&self) -> usize {
        self.state().duplicates
    }

    /// Take every item in insertion order, leaving the queue empty.
    pub fn drain(&self) -> Vec<QueueItem> {
        let mut state = self.state();
        state.keys.clear();
        std::mem::take(&mut state.items)
    }
}

impl std::fmt::Debug for ResolutionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("ResolutionQueue")
            .field("len", &state.items.len())
            .field("duplicates", &state.duplicates)
            .finish()
    }
}
