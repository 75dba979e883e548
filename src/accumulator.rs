//! Result accumulation
//!
//! [`ResultSet`] is the consumer-facing surface of a traversal: an
//! append-only collection of resolved records plus a loading flag. The
//! harvester is the only writer; consumers hold a cloned handle and re-read
//! snapshots whenever they want to render, tolerating growth between reads.

use crate::types::{DetailRecord, ItemId};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Thread-safe, append-only collection of resolved detail records
///
/// Records are keyed by identifier: a record whose identifier is already
/// present is silently skipped, so the set never holds duplicates and never
/// overwrites an existing entry. Insertion order is preserved (batch order
/// across batches; arrival order within a batch's fan-out).
///
/// Cloning is cheap and all clones observe the same state.
#[derive(Clone)]
pub struct ResultSet {
    inner: Arc<Shared>,
}

struct Shared {
    store: RwLock<Store>,
    loading: AtomicBool,
}

#[derive(Default)]
struct Store {
    records: Vec<DetailRecord>,
    seen: HashSet<ItemId>,
}

impl ResultSet {
    /// Create an empty result set in the loading state
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Shared {
                store: RwLock::new(Store::default()),
                loading: AtomicBool::new(true),
            }),
        }
    }

    /// Append records, skipping any whose identifier is already present.
    ///
    /// Returns the number of records actually inserted.
    pub fn append(&self, records: Vec<DetailRecord>) -> usize {
        let mut store = self
            .inner
            .store
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut inserted = 0;
        for record in records {
            if store.seen.insert(record.item_id()) {
                store.records.push(record);
                inserted += 1;
            }
        }
        inserted
    }

    /// A point-in-time copy of the accumulated records.
    ///
    /// Later calls may return a longer list; existing entries never change
    /// or move relative to each other.
    pub fn snapshot(&self) -> Vec<DetailRecord> {
        self.inner
            .store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .records
            .clone()
    }

    /// Whether an identifier has been resolved into the set
    pub fn contains(&self, id: &ItemId) -> bool {
        self.inner
            .store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .seen
            .contains(id)
    }

    /// Number of accumulated records
    pub fn len(&self) -> usize {
        self.inner
            .store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .records
            .len()
    }

    /// True if no record has been accumulated yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while the traversal is still running.
    ///
    /// Starts true and transitions to false exactly once, when the
    /// traversal completes or aborts; it never toggles back.
    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire)
    }

    /// Mark the traversal finished. Called once by the harvester.
    pub(crate) fn finish(&self) {
        self.inner.loading.store(false, Ordering::Release);
    }
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::new()
    }
}
