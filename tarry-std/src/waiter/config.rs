//! Waiter configuration.

/// Settings for an [`EventWaiter`](super::EventWaiter).
#[derive(Debug, Clone)]
pub struct WaiterConfig {
    /// Name of the owned timer thread. Unused with a shared scheduler.
    pub thread_name: String,
    /// Drop a key's waiter set as soon as it becomes empty.
    ///
    /// With this off, empty sets stay in the table until
    /// [`EventWaiter::prune`](super::EventWaiter::prune) is called.
    pub prune_empty: bool,
    /// Run every condition and action under `catch_unwind`.
    ///
    /// With this on, a panicking callback is logged and reported to the
    /// failure observer, and the other waiters of the same dispatch still
    /// run. With this off, the panic unwinds out of `dispatch` (or out of
    /// the scheduler's task).
    pub isolate_callbacks: bool,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            thread_name: "tarry-timer".to_string(),
            prune_empty: true,
            isolate_callbacks: true,
        }
    }
}
