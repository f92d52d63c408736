//! Scheduler on a host-owned tokio runtime.

use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use tarry_core::{Cancel, ScheduleError, Scheduler, Task, TimerHandle};
use tokio::{runtime::Handle, task::AbortHandle};

/// Schedules each task as a sleeping tokio task on a runtime the host owns.
///
/// The runtime is never shut down from here. [`shutdown`](Scheduler::shutdown)
/// only stops this scheduler from accepting new tasks; tasks already spawned
/// keep running on the runtime.
///
/// Tasks run on a runtime worker thread and must not block it for long.
pub struct TokioScheduler {
    handle: Handle,
    shutdown: AtomicBool,
}

impl TokioScheduler {
    /// Schedule onto the runtime behind `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            shutdown: AtomicBool::new(false),
        }
    }

    /// Schedule onto the runtime the caller is running on.
    ///
    /// Returns `None` outside of a tokio runtime.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

struct Abort(AbortHandle);

impl Cancel for Abort {
    fn cancel(&self) {
        self.0.abort();
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Result<TimerHandle, ScheduleError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(ScheduleError::Shutdown);
        }
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        Ok(TimerHandle::new(Abort(join.abort_handle())))
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}
