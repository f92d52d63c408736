//! Deferred execution facility.
//!
//! Waiters with a timeout hand a one-shot [`Task`] to a [`Scheduler`]. The
//! scheduler runs the task once, on its own execution context, after at
//! least the requested delay. The task itself is what arbitrates against a
//! concurrent match, so a scheduler never needs to know about waiters.

use crate::error::ScheduleError;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

/// A one-shot unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks after a delay.
///
/// Implementations may be owned by a single waiter or shared with the rest
/// of the host. A waiter only calls [`shutdown`](Scheduler::shutdown) on a
/// scheduler it owns.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Scheduler`",
    label = "missing `Scheduler` implementation",
    note = "Schedulers must be `Send + Sync + 'static` and implement `schedule`, `is_shutdown` and `shutdown`."
)]
pub trait Scheduler: Send + Sync + 'static {
    /// Run `task` once after at least `delay` has elapsed.
    ///
    /// Returns [`ScheduleError::Shutdown`] if the scheduler no longer
    /// accepts work. An accepted task may still be dropped without running
    /// if it is cancelled through the returned handle first.
    fn schedule(&self, delay: Duration, task: Task) -> Result<TimerHandle, ScheduleError>;

    /// Returns `true` once the scheduler stopped accepting work.
    fn is_shutdown(&self) -> bool;

    /// Stop accepting new work.
    ///
    /// Whether already accepted tasks still run is up to the implementation;
    /// the schedulers shipped with Tarry let them run.
    fn shutdown(&self);
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn schedule(&self, delay: Duration, task: Task) -> Result<TimerHandle, ScheduleError> {
        (**self).schedule(delay, task)
    }

    fn is_shutdown(&self) -> bool {
        (**self).is_shutdown()
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}

/// Best-effort cancellation of a scheduled task.
pub trait Cancel: Send + Sync + 'static {
    /// Prevent the task from running if it has not started yet.
    fn cancel(&self);
}

/// A shared flag checked by the scheduler right before it runs a task.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once [`Cancel::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Cancel for CancelFlag {
    fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Handle to a scheduled task.
///
/// Cancelling races with the task firing; callers must tolerate the task
/// running anyway. Dropping the handle does not cancel the task.
pub struct TimerHandle {
    cancel: Option<Box<dyn Cancel>>,
}

impl TimerHandle {
    /// A handle that cancels through `cancel`.
    pub fn new(cancel: impl Cancel) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle for a scheduler without cancellation support.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Returns `true` if cancelling this handle has any effect.
    pub fn is_cancellable(&self) -> bool {
        self.cancel.is_some()
    }

    /// Attempt to prevent the task from running.
    pub fn cancel(self) {
        if let Some(cancel) = self.cancel {
            cancel.cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancellable", &self.is_cancellable())
            .finish()
    }
}
