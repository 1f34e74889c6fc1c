//! Caller-owned, order-significant record list with change notification.

use std::sync::Arc;

use shared::domain::{EntityKey, Record};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Shared handle to an ordered list of records.
///
/// Clones refer to the same list. Every mutating method is one atomic step
/// that wakes subscribers once; readers never observe a half-applied change.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<watch::Sender<Vec<Record>>>,
}

impl Default for Collection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<Record>> for Collection {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("len", &self.len())
            .finish()
    }
}

impl Collection {
    pub fn new(records: Vec<Record>) -> Self {
        let (tx, _rx) = watch::channel(records);
        Self { inner: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> Vec<Record> {
        self.inner.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    pub fn get(&self, key: &EntityKey, id: &str) -> Option<Record> {
        self.inner
            .borrow()
            .iter()
            .find(|record| key.matches(record, id))
            .cloned()
    }

    pub fn position(&self, key: &EntityKey, id: &str) -> Option<usize> {
        key.position(&self.inner.borrow(), id)
    }

    pub fn contains(&self, key: &EntityKey, id: &str) -> bool {
        self.position(key, id).is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Record>> {
        self.inner.subscribe()
    }

    /// Stream of full snapshots, starting with the current one.
    pub fn changes(&self) -> WatchStream<Vec<Record>> {
        WatchStream::new(self.subscribe())
    }

    /// Runs `f` against the list in one step. Subscribers are notified only
    /// when `f` returns `Some`.
    pub fn modify<R>(&self, f: impl FnOnce(&mut Vec<Record>) -> Option<R>) -> Option<R> {
        let mut outcome = None;
        self.inner.send_if_modified(|records| {
            outcome = f(records);
            outcome.is_some()
        });
        outcome
    }

    pub fn push_front(&self, record: Record) {
        self.inner.send_modify(|records| records.insert(0, record));
    }

    /// Inserts at `index`, clamped to the current length. Returns the index used.
    pub fn insert_at(&self, index: usize, record: Record) -> usize {
        let mut used = index;
        self.inner.send_modify(|records| {
            used = index.min(records.len());
            records.insert(used, record);
        });
        used
    }

    /// Edits the first record with the given id in place, keeping its position.
    pub fn update_with<R>(
        &self,
        key: &EntityKey,
        id: &str,
        f: impl FnOnce(&mut Record) -> R,
    ) -> Option<R> {
        self.modify(|records| {
            let record = records.iter_mut().find(|record| key.matches(record, id))?;
            Some(f(record))
        })
    }

    /// Removes the first record with the given id and returns it with its index.
    pub fn remove(&self, key: &EntityKey, id: &str) -> Option<(usize, Record)> {
        self.modify(|records| {
            let index = key.position(records, id)?;
            Some((index, records.remove(index)))
        })
    }

    /// Removes every record with the given id. Returns how many were removed.
    pub fn remove_all(&self, key: &EntityKey, id: &str) -> usize {
        self.modify(|records| {
            let before = records.len();
            records.retain(|record| !key.matches(record, id));
            let removed = before - records.len();
            (removed > 0).then_some(removed)
        })
        .unwrap_or(0)
    }
}
