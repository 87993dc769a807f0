use tokio::sync::watch;
use tracing::debug;

use crate::cache::{BatchCache, CacheSlot};
use crate::models::TemplateRecord;

/// Publishes the displayable record list derived from the batch cache.
///
/// The visible list is the longest gap-free prefix of the cache:
/// records in ascending serial order, stopping at the first `Unknown`
/// slot. End-of-data sentinels are confirmed holes and are skipped, not
/// stopped at, so a sparse serial space still displays. Consumers
/// subscribe through a watch channel and only see changed lists.
pub struct DisplaySync {
    tx: watch::Sender<Vec<TemplateRecord>>,
    prefetch_threshold: usize,
}

impl DisplaySync {
    pub fn new(prefetch_threshold: usize) -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            tx,
            prefetch_threshold,
        }
    }

    fn derive_visible_list(cache: &BatchCache) -> Vec<TemplateRecord> {
        let mut visible = Vec::new();
        for slot in cache.slots() {
            match slot {
                CacheSlot::Record(record) => visible.push(record.clone()),
                CacheSlot::EndOfData => continue,
                CacheSlot::Unknown => break,
            }
        }
        visible
    }

    /// Recompute the visible list and publish it if it changed. Returns
    /// the published list length.
    pub fn publish(&self, cache: &BatchCache) -> usize {
        let list = Self::derive_visible_list(cache);
        let len = list.len();
        if *self.tx.borrow() != list {
            debug!(visible = len, "visible list updated");
            self.tx.send_replace(list);
        }
        len
    }

    /// A new receiver observing the current list and all later updates.
    pub fn subscribe(&self) -> watch::Receiver<Vec<TemplateRecord>> {
        self.tx.subscribe()
    }

    /// The currently published list.
    pub fn snapshot(&self) -> Vec<TemplateRecord> {
        self.tx.borrow().clone()
    }

    /// True when the viewer is close enough to the end of the visible
    /// list that the next window should be prefetched.
    pub fn near_boundary(&self, visible_index: usize, total_known: usize) -> bool {
        total_known > 0 && visible_index + self.prefetch_threshold >= total_known - 1
    }
}
