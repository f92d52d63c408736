//! Single-worker timer thread.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::{Mutex, RwLock};
use std::{
    cmp::Ordering as CmpOrdering,
    collections::BinaryHeap,
    fmt, io,
    panic::{self, AssertUnwindSafe},
    sync::atomic::{AtomicU64, Ordering},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use tarry_core::{CancelFlag, ScheduleError, Scheduler, Task, TimerHandle};

/// Deadline used when `now + delay` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 100);

/// Queue length below which cancelled timers are left for `run_due` to skip.
const PURGE_MIN: usize = 64;

/// Longest sleep while draining, so cancels of far-off timers are noticed.
const DRAIN_POLL: Duration = Duration::from_millis(50);

enum Command {
    Schedule(Timer),
    Shutdown,
}

struct Timer {
    due: Instant,
    seq: u64,
    cancelled: CancelFlag,
    task: Task,
}

// BinaryHeap is a max-heap; order so the earliest (due, seq) pops first.
impl Ord for Timer {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Timer {}

fn deadline(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Pending timers, earliest first.
///
/// Cancelled timers are dropped in bulk whenever the heap doubles past its
/// live size, so long-delay timers that get cancelled do not pile up.
struct TimerQueue {
    heap: BinaryHeap<Timer>,
    purge_at: usize,
}

impl TimerQueue {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            purge_at: PURGE_MIN,
        }
    }

    fn push(&mut self, timer: Timer) {
        self.heap.push(timer);
        if self.heap.len() >= self.purge_at {
            self.heap.retain(|timer| !timer.cancelled.is_cancelled());
            self.purge_at = (self.heap.len() * 2).max(PURGE_MIN);
        }
    }

    /// Deadline of the earliest live timer, dropping cancelled ones ahead of it.
    fn next_due(&mut self) -> Option<Instant> {
        while self.heap.peek()?.cancelled.is_cancelled() {
            self.heap.pop();
        }
        self.heap.peek().map(|timer| timer.due)
    }

    fn pop_due(&mut self, now: Instant) -> Option<Timer> {
        if self.heap.peek()?.due <= now {
            self.heap.pop()
        } else {
            None
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// A scheduler backed by one dedicated thread.
///
/// Tasks run one at a time on the worker thread, in deadline order (ties in
/// submission order). [`shutdown`](Scheduler::shutdown) stops new
/// submissions but lets every accepted task run at its deadline; the worker
/// exits once its queue is empty. Cancelled tasks never run.
///
/// Delays too large to represent as an [`Instant`] are clamped to a
/// deadline about a century out.
///
/// A panicking task is caught and logged; the worker keeps running.
pub struct ThreadScheduler {
    tx: Sender<Command>,
    // Held shared while submitting and exclusively while shutting down, so no
    // `Schedule` command can be queued behind `Shutdown`.
    shutdown: RwLock<bool>,
    seq: AtomicU64,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadScheduler {
    /// Spawn a worker thread named `tarry-timer`.
    ///
    /// # Panics
    ///
    /// Panics if the thread cannot be spawned.
    pub fn new() -> Self {
        Self::try_named("tarry-timer").expect("failed to spawn tarry timer thread")
    }

    /// Spawn a worker thread with the given name.
    pub fn try_named(name: &str) -> io::Result<Self> {
        let (tx, rx) = unbounded::<Command>();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(rx))?;
        Ok(Self {
            tx,
            shutdown: RwLock::new(false),
            seq: AtomicU64::new(0),
            join: Mutex::new(Some(join)),
        })
    }

    /// Shut down and block until every accepted task has run.
    pub fn join(&self) {
        self.shutdown();
        let handle = self.join.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("tarry timer thread panicked");
            }
        }
    }

    fn worker_exited(&self) -> bool {
        self.join
            .lock()
            .as_ref()
            .is_none_or(|handle| handle.is_finished())
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Result<TimerHandle, ScheduleError> {
        let shutdown = self.shutdown.read();
        if *shutdown {
            return Err(ScheduleError::Shutdown);
        }
        let cancelled = CancelFlag::new();
        let timer = Timer {
            due: deadline(Instant::now(), delay),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            cancelled: cancelled.clone(),
            task,
        };
        // Fails only if the worker thread died.
        self.tx
            .send(Command::Schedule(timer))
            .map_err(|_| ScheduleError::Shutdown)?;
        Ok(TimerHandle::new(cancelled))
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown.read() || self.worker_exited()
    }

    fn shutdown(&self) {
        let mut shutdown = self.shutdown.write();
        if !*shutdown {
            *shutdown = true;
            let _ = self.tx.send(Command::Shutdown);
        }
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        // Detach: the worker finishes the accepted tasks on its own.
        self.shutdown();
    }
}

impl fmt::Debug for ThreadScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadScheduler")
            .field("shutdown", &*self.shutdown.read())
            .finish_non_exhaustive()
    }
}

fn worker_loop(rx: Receiver<Command>) {
    let mut queue = TimerQueue::new();
    let mut draining = false;
    let mut disconnected = false;

    loop {
        run_due(&mut queue);
        let next_due = queue.next_due();

        if draining || disconnected {
            // `Shutdown` is always the last command, so nothing else can
            // arrive; run out the queue and exit.
            match next_due {
                Some(due) => {
                    thread::sleep(due.saturating_duration_since(Instant::now()).min(DRAIN_POLL));
                    continue;
                }
                None => break,
            }
        }

        let received = match next_due {
            Some(due) => rx.recv_timeout(due.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Command::Schedule(timer)) => queue.push(timer),
            Ok(Command::Shutdown) => draining = true,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => disconnected = true,
        }
    }
    tracing::debug!("tarry timer thread exiting");
}

fn run_due(queue: &mut TimerQueue) {
    let now = Instant::now();
    while let Some(timer) = queue.pop_due(now) {
        if timer.cancelled.is_cancelled() {
            continue;
        }
        if panic::catch_unwind(AssertUnwindSafe(timer.task)).is_err() {
            tracing::error!("scheduled task panicked");
        }
    }
}
