//! Testing utilities for Tarry.
//!
//! This module provides utilities to make testing waits deterministic.
//!
//! # Features
//!
//! - [`ManualScheduler`]: A scheduler driven by a virtual clock
//! - [`Counter`]: A shared call counter for callbacks
//! - [`CallLog`]: A shared, ordered record of values seen by callbacks
//! - [`RecordingObserver`]: A failure observer that keeps every failure

use crate::observe::FailureObserver;
use parking_lot::Mutex;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tarry_core::{CallbackFailure, CancelFlag, ScheduleError, Scheduler, Task, TimerHandle};

// ============================================================================
// Manual Scheduler
// ============================================================================

struct Entry {
    due: Duration,
    seq: u64,
    cancelled: CancelFlag,
    task: Task,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    seq: u64,
    entries: Vec<Entry>,
}

impl Clock {
    /// Removes the earliest entry due at or before `deadline`.
    fn pop_due(&mut self, deadline: Duration) -> Option<Entry> {
        self.entries.retain(|entry| !entry.cancelled.is_cancelled());
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= deadline)
            .min_by_key(|(_, entry)| (entry.due, entry.seq))
            .map(|(index, _)| index)?;
        Some(self.entries.swap_remove(index))
    }
}

/// A scheduler whose time only moves when the test says so.
///
/// Tasks run on the thread calling [`advance`](ManualScheduler::advance),
/// in deadline order, with ties broken by submission order. Tasks that
/// schedule further tasks are picked up by the same `advance` if they fall
/// inside the advanced window.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = Arc::new(ManualScheduler::new());
/// let waiter = EventWaiter::with_scheduler(scheduler.clone());
///
/// waiter.register_with_timeout(key, cond, on_match, Duration::from_secs(5), on_timeout)?;
///
/// scheduler.advance(Duration::from_secs(4)); // nothing yet
/// scheduler.advance(Duration::from_secs(1)); // on_timeout runs here
/// ```
#[derive(Default)]
pub struct ManualScheduler {
    clock: Mutex<Clock>,
    shutdown: AtomicBool,
}

impl ManualScheduler {
    /// Create a scheduler at virtual time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Number of accepted tasks that are neither run nor cancelled.
    pub fn pending(&self) -> usize {
        self.clock
            .lock()
            .entries
            .iter()
            .filter(|entry| !entry.cancelled.is_cancelled())
            .count()
    }

    /// Move the clock forward by `by`, running every task that falls due.
    ///
    /// Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let deadline = self.clock.lock().now.saturating_add(by);
        let mut ran = 0;
        loop {
            // Never hold the clock lock while a task runs.
            let next = {
                let mut clock = self.clock.lock();
                let next = clock.pop_due(deadline);
                if let Some(entry) = &next {
                    clock.now = clock.now.max(entry.due);
                }
                next
            };
            let Some(entry) = next else {
                break;
            };
            (entry.task)();
            ran += 1;
        }
        let mut clock = self.clock.lock();
        clock.now = clock.now.max(deadline);
        ran
    }

    /// Advance until no tasks are left. Returns the number of tasks run.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let last_due = {
                let mut clock = self.clock.lock();
                clock.entries.retain(|entry| !entry.cancelled.is_cancelled());
                let now = clock.now;
                clock
                    .entries
                    .iter()
                    .map(|entry| entry.due)
                    .max()
                    .map(|due| due.saturating_sub(now))
            };
            match last_due {
                Some(by) => ran += self.advance(by),
                None => return ran,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Result<TimerHandle, ScheduleError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(ScheduleError::Shutdown);
        }
        let cancelled = CancelFlag::new();
        let mut clock = self.clock.lock();
        let entry = Entry {
            due: clock.now.saturating_add(delay),
            seq: clock.seq,
            cancelled: cancelled.clone(),
            task,
        };
        clock.seq += 1;
        clock.entries.push(entry);
        Ok(TimerHandle::new(cancelled))
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now())
            .field("pending", &self.pending())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

// ============================================================================
// Counter
// ============================================================================

/// A cloneable counter, for asserting how often a callback ran.
///
/// # Example
///
/// ```rust,ignore
/// let hits = Counter::new();
/// let h = hits.clone();
/// waiter.register(key, |_: &Ping| true, move |_: &Ping| h.increment())?;
///
/// waiter.dispatch(&Ping, None);
/// assert_eq!(hits.count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Counter {
    count: Arc<AtomicUsize>,
}

impl Counter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one.
    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Current value.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reset to zero.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

// ============================================================================
// Call Log
// ============================================================================

/// A cloneable, ordered log of values pushed by callbacks.
pub struct CallLog<T> {
    entries: Arc<Mutex<Vec<T>>>,
}

impl<T> CallLog<T> {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append a value.
    pub fn push(&self, value: T) {
        self.entries.lock().push(value);
    }

    /// Number of values logged.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Clear the log.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl<T: Clone> CallLog<T> {
    /// A copy of the logged values, oldest first.
    pub fn entries(&self) -> Vec<T> {
        self.entries.lock().clone()
    }
}

impl<T> Default for CallLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for CallLog<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CallLog<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.lock().iter()).finish()
    }
}

// ============================================================================
// Recording Observer
// ============================================================================

/// A failure observer that keeps every failure it is handed.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    failures: CallLog<CallbackFailure>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The failures seen so far, oldest first.
    pub fn failures(&self) -> Vec<CallbackFailure> {
        self.failures.entries()
    }

    /// Number of failures seen.
    pub fn count(&self) -> usize {
        self.failures.len()
    }
}

impl FailureObserver for RecordingObserver {
    fn on_failure(&self, failure: &CallbackFailure) {
        self.failures.push(failure.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_task(log: &CallLog<&'static str>, label: &'static str) -> Task {
        let log = log.clone();
        Box::new(move || log.push(label))
    }

    #[test]
    fn advance_runs_due_tasks_in_order() {
        let scheduler = ManualScheduler::new();
        let log = CallLog::new();
        scheduler.schedule(Duration::from_secs(3), push_task(&log, "c")).unwrap();
        scheduler.schedule(Duration::from_secs(1), push_task(&log, "a")).unwrap();
        scheduler.schedule(Duration::from_secs(1), push_task(&log, "b")).unwrap();

        assert_eq!(scheduler.advance(Duration::from_millis(999)), 0);
        assert_eq!(scheduler.advance(Duration::from_millis(1)), 2);
        assert_eq!(log.entries(), vec!["a", "b"]);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.now(), Duration::from_secs(1));

        assert_eq!(scheduler.run_all(), 1);
        assert_eq!(log.entries(), vec!["a", "b", "c"]);
        assert_eq!(scheduler.now(), Duration::from_secs(3));
    }

    #[test]
    fn tasks_scheduled_by_tasks_run_within_window() {
        let scheduler = Arc::new(ManualScheduler::new());
        let log = CallLog::new();
        let inner = {
            let scheduler = scheduler.clone();
            let log = log.clone();
            move || {
                log.push("outer");
                let log = log.clone();
                scheduler
                    .schedule(Duration::from_secs(1), Box::new(move || log.push("inner")))
                    .unwrap();
            }
        };
        scheduler.schedule(Duration::from_secs(1), Box::new(inner)).unwrap();

        assert_eq!(scheduler.advance(Duration::from_secs(2)), 2);
        assert_eq!(log.entries(), vec!["outer", "inner"]);
    }

    #[test]
    fn cancelled_and_rejected_tasks() {
        let scheduler = ManualScheduler::new();
        let log = CallLog::new();
        let timer = scheduler.schedule(Duration::from_secs(1), push_task(&log, "x")).unwrap();
        timer.cancel();
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.advance(Duration::from_secs(5)), 0);
        assert!(log.is_empty());

        scheduler.shutdown();
        assert_eq!(
            scheduler.schedule(Duration::ZERO, push_task(&log, "y")).unwrap_err(),
            ScheduleError::Shutdown
        );
    }

    #[test]
    fn unbounded_delay_saturates_the_clock() {
        let scheduler = ManualScheduler::new();
        let log = CallLog::new();
        scheduler.advance(Duration::from_secs(10));
        scheduler.schedule(Duration::MAX, push_task(&log, "never")).unwrap();
        assert_eq!(scheduler.pending(), 1);

        assert_eq!(scheduler.advance(Duration::from_secs(3600)), 0);
        assert_eq!(scheduler.advance(Duration::MAX), 1);
        assert_eq!(scheduler.now(), Duration::MAX);
        assert_eq!(log.entries(), vec!["never"]);
    }

    #[test]
    fn counter_counts() {
        let counter = Counter::new();
        let other = counter.clone();
        counter.increment();
        other.increment();
        assert_eq!(counter.count(), 2);
        counter.reset();
        assert_eq!(other.count(), 0);
    }
}
