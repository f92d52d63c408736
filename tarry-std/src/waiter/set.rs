//! Per-key collection of pending waits.

use super::record::{ErasedCondition, WaitRecord};
use parking_lot::Mutex;
use std::{collections::BTreeMap, fmt, sync::Arc};
use tarry_core::{DispatchKey, TimerHandle, WaitId};

/// The waits registered under one [`DispatchKey`].
///
/// Every mutation happens under the set's own mutex, and the mutex is never
/// held while user code runs. [`take`](WaiterSet::take) is the single point
/// of arbitration between a dispatch match, a timer expiry and a manual
/// cancel: it removes the record only if it is still present, and exactly
/// one caller gets it.
///
/// Records are kept ordered by id, so snapshots list waits in registration
/// order.
pub struct WaiterSet {
    key: DispatchKey,
    state: Mutex<SetState>,
}

#[derive(Default)]
struct SetState {
    records: BTreeMap<WaitId, WaitRecord>,
    // Set when the key table dropped this set; inserts must go to a fresh one.
    retired: bool,
}

impl WaiterSet {
    pub(crate) fn new(key: DispatchKey) -> Self {
        Self {
            key,
            state: Mutex::new(SetState::default()),
        }
    }

    /// The key this set serves.
    pub fn key(&self) -> DispatchKey {
        self.key
    }

    /// Number of pending waits.
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Returns `true` if no wait is pending.
    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    /// Returns `true` if the wait `id` is still pending here.
    pub fn contains(&self, id: WaitId) -> bool {
        self.state.lock().records.contains_key(&id)
    }

    /// Add a record. Hands it back if the set was retired.
    pub(crate) fn insert(&self, record: WaitRecord) -> Result<(), WaitRecord> {
        let mut state = self.state.lock();
        if state.retired {
            return Err(record);
        }
        state.records.insert(record.id(), record);
        Ok(())
    }

    /// Attach the timer of a pending record.
    ///
    /// If the record is already gone the timer is cancelled right away.
    pub(crate) fn attach_timer(&self, id: WaitId, timer: TimerHandle) {
        let orphan = {
            let mut state = self.state.lock();
            match state.records.get_mut(&id) {
                Some(record) => {
                    record.set_timer(timer);
                    None
                }
                None => Some(timer),
            }
        };
        if let Some(timer) = orphan {
            timer.cancel();
        }
    }

    /// Atomically remove the record `id` if it is still present.
    ///
    /// Returns `None` if another contender already took it.
    pub(crate) fn take(&self, id: WaitId) -> Option<WaitRecord> {
        self.state.lock().records.remove(&id)
    }

    /// Copy out the current members so conditions can run without the lock.
    pub(crate) fn snapshot(&self) -> Vec<(WaitId, Arc<ErasedCondition>)> {
        self.state
            .lock()
            .records
            .values()
            .map(|record| (record.id(), Arc::clone(record.condition())))
            .collect()
    }

    /// Mark the set retired if it is empty. Returns `true` if it was.
    pub(crate) fn retire_if_empty(&self) -> bool {
        let mut state = self.state.lock();
        if state.records.is_empty() {
            state.retired = true;
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for WaiterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("WaiterSet")
            .field("key", &self.key)
            .field("pending", &state.records.len())
            .field("retired", &state.retired)
            .finish()
    }
}
