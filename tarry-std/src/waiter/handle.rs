//! Handles to registered waits.

use super::{registry::Shared, set::WaiterSet};
use std::{
    fmt,
    sync::{Arc, Weak},
};
use tarry_core::{DispatchKey, WaitId};

/// Handle to one registered wait.
///
/// Dropping the handle does not cancel the wait.
pub struct WaitHandle {
    id: WaitId,
    set: Arc<WaiterSet>,
    shared: Weak<Shared>,
}

impl WaitHandle {
    pub(crate) fn new(id: WaitId, set: Arc<WaiterSet>, shared: Weak<Shared>) -> Self {
        Self { id, set, shared }
    }

    /// The wait's id.
    pub fn id(&self) -> WaitId {
        self.id
    }

    /// The key the wait was registered under.
    pub fn key(&self) -> DispatchKey {
        self.set.key()
    }

    /// Returns `true` while neither a match, a timeout nor a cancel has
    /// completed the wait.
    pub fn is_pending(&self) -> bool {
        self.set.contains(self.id)
    }

    /// Withdraw the wait so that neither of its actions runs.
    ///
    /// Returns `false` if the wait already completed, in which case exactly
    /// one of its actions has run or is running.
    pub fn cancel(&self) -> bool {
        let Some(record) = self.set.take(self.id) else {
            return false;
        };
        record.discard();
        if let Some(shared) = self.shared.upgrade() {
            shared.cancelled(&self.set);
        }
        tracing::debug!(key = %self.set.key(), id = %self.id, "wait cancelled");
        true
    }
}

impl fmt::Debug for WaitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitHandle")
            .field("id", &self.id)
            .field("key", &self.set.key())
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{Counter, ManualScheduler};
    use crate::waiter::EventWaiter;
    use std::{sync::Arc, time::Duration};
    use tarry_core::{DispatchKey, Message};

    struct Tick;
    impl Message for Tick {}

    #[test]
    fn cancel_suppresses_both_actions() {
        let scheduler = Arc::new(ManualScheduler::new());
        let waiter = EventWaiter::with_scheduler(scheduler.clone());
        let fired = Counter::new();
        let (m, t) = (fired.clone(), fired.clone());
        let handle = waiter
            .register_with_timeout(
                DispatchKey::of::<Tick>(),
                |_: &Tick| true,
                move |_: &Tick| m.increment(),
                Duration::from_secs(1),
                move || t.increment(),
            )
            .unwrap();

        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert_eq!(waiter.dispatch(&Tick, None), 0);
        scheduler.advance(Duration::from_secs(2));
        assert_eq!(fired.count(), 0);
        assert_eq!(waiter.stats().cancelled, 1);
        // The timer was cancelled along with the wait.
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn cancel_after_match_reports_false() {
        let scheduler = Arc::new(ManualScheduler::new());
        let waiter = EventWaiter::with_scheduler(scheduler);
        let handle = waiter
            .register(DispatchKey::of::<Tick>(), |_: &Tick| true, |_: &Tick| {})
            .unwrap();
        assert_eq!(handle.key(), DispatchKey::of::<Tick>());
        waiter.dispatch(&Tick, None);
        assert!(!handle.is_pending());
        assert!(!handle.cancel());
    }
}
