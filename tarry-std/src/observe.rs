//! Failure observation.
//!
//! A panicking condition or action has nobody to return an error to: the
//! registrant left the call stack when `register` returned. The waiter logs
//! such failures through `tracing` and also hands them to an optional
//! [`FailureObserver`] supplied by the host.

use tarry_core::CallbackFailure;

/// Receives callback failures isolated by a waiter.
///
/// Observers run on whichever thread hit the failure (a dispatching thread
/// or the scheduler's) and must not block.
pub trait FailureObserver: Send + Sync + 'static {
    /// Called once per failed callback.
    fn on_failure(&self, failure: &CallbackFailure);
}

impl<F> FailureObserver for F
where
    F: Fn(&CallbackFailure) + Send + Sync + 'static,
{
    fn on_failure(&self, failure: &CallbackFailure) {
        self(failure)
    }
}

/// Observer that logs every failure at `warn` level in addition to the
/// waiter's own `error` event.
///
/// Events are emitted under this module's tracing target. The label is
/// attached as an `observer` field, so subscribers can tell several logging
/// observers apart by filtering on it.
#[derive(Debug, Clone, Copy)]
pub struct LoggingObserver {
    label: &'static str,
}

impl LoggingObserver {
    /// Tag every event with `label`.
    pub const fn new(label: &'static str) -> Self {
        Self { label }
    }

    /// Value of the `observer` field on emitted events.
    pub const fn label(&self) -> &'static str {
        self.label
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new("tarry::failures")
    }
}

impl FailureObserver for LoggingObserver {
    fn on_failure(&self, failure: &CallbackFailure) {
        tracing::warn!(
            observer = self.label,
            key = %failure.key(),
            id = %failure.id(),
            stage = %failure.stage(),
            "{}",
            failure.message()
        );
    }
}
