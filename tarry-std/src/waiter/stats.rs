//! Waiter counters.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct WaiterStats {
    registered: AtomicU64,
    matched: AtomicU64,
    expired: AtomicU64,
    cancelled: AtomicU64,
    callback_failures: AtomicU64,
}

impl WaiterStats {
    pub(crate) fn registered(&self) {
        self.registered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn unregistered(&self) {
        self.registered.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn matched(&self) {
        self.matched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn callback_failed(&self) {
        self.callback_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            registered: self.registered.load(Ordering::Relaxed),
            matched: self.matched.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a waiter's counters.
///
/// Counters are updated independently, so a snapshot taken while other
/// threads are active may be momentarily inconsistent (e.g. a match counted
/// before its registration is visible).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Waits accepted by `register`.
    pub registered: u64,
    /// Waits completed by a matching event.
    pub matched: u64,
    /// Waits completed by their timeout.
    pub expired: u64,
    /// Waits completed by a manual cancel.
    pub cancelled: u64,
    /// User callbacks that panicked.
    pub callback_failures: u64,
}

impl StatsSnapshot {
    /// Waits still pending: registered minus every completion.
    pub fn pending(&self) -> u64 {
        self.registered
            .saturating_sub(self.matched + self.expired + self.cancelled)
    }
}
