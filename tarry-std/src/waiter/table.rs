//! Key → waiter set mapping.

use super::{record::WaitRecord, set::WaiterSet};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use tarry_core::DispatchKey;

/// Concurrent map from [`DispatchKey`] to its [`WaiterSet`].
///
/// The table lock only guards the map itself and is held just long enough
/// to clone or swap an `Arc`. Work on a set happens under that set's own
/// lock, so unrelated keys never serialize on each other.
///
/// Lock order is table, then set. Nothing takes them the other way around.
#[derive(Default)]
pub(crate) struct KeyTable {
    sets: RwLock<HashMap<DispatchKey, Arc<WaiterSet>>>,
}

impl KeyTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, key: &DispatchKey) -> Option<Arc<WaiterSet>> {
        self.sets.read().get(key).cloned()
    }

    fn get_or_create(&self, key: &DispatchKey) -> Arc<WaiterSet> {
        if let Some(set) = self.get(key) {
            return set;
        }
        let mut sets = self.sets.write();
        Arc::clone(
            sets.entry(*key)
                .or_insert_with(|| Arc::new(WaiterSet::new(*key))),
        )
    }

    /// Insert `record` into the set for `key`, creating the set if needed.
    ///
    /// A set pruned between lookup and insert is retired and hands the
    /// record back; the insert then retries against the replacement.
    pub(crate) fn insert(&self, key: &DispatchKey, mut record: WaitRecord) -> Arc<WaiterSet> {
        loop {
            let set = self.get_or_create(key);
            match set.insert(record) {
                Ok(()) => return set,
                Err(rejected) => record = rejected,
            }
        }
    }

    /// Drop `set` from the table if it is still the live set for its key and
    /// is empty.
    pub(crate) fn prune_if_empty(&self, set: &Arc<WaiterSet>) -> bool {
        let key = set.key();
        let mut sets = self.sets.write();
        let is_live = sets.get(&key).is_some_and(|live| Arc::ptr_eq(live, set));
        if is_live && set.retire_if_empty() {
            sets.remove(&key);
            true
        } else {
            false
        }
    }

    /// Drop every empty set. Returns how many were dropped.
    pub(crate) fn prune(&self) -> usize {
        let mut sets = self.sets.write();
        let before = sets.len();
        sets.retain(|_, set| !set.retire_if_empty());
        before - sets.len()
    }

    /// Number of keys with a live set.
    pub(crate) fn len(&self) -> usize {
        self.sets.read().len()
    }

    pub(crate) fn keys(&self) -> Vec<DispatchKey> {
        self.sets.read().keys().copied().collect()
    }

    pub(crate) fn pending(&self, key: &DispatchKey) -> usize {
        self.get(key).map_or(0, |set| set.len())
    }

    pub(crate) fn pending_total(&self) -> usize {
        let sets: Vec<Arc<WaiterSet>> = self.sets.read().values().cloned().collect();
        sets.iter().map(|set| set.len()).sum()
    }
}
