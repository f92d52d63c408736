//! The event waiter: registration, dispatch and lifecycle.

use super::{
    config::WaiterConfig,
    handle::WaitHandle,
    record::{WaitRecord, erase_action, erase_condition},
    set::WaiterSet,
    stats::{StatsSnapshot, WaiterStats},
    table::KeyTable,
    wait::{Registration, WaitBuilder},
};
use crate::{observe::FailureObserver, scheduler::ThreadScheduler};
use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};
use tarry_core::{
    CallbackFailure, Condition, DispatchKey, EventKind, Message, Priority, Scheduler, Stage, Task,
    TarryError, WaitError, WaitId,
};
use tracing::{debug, error, trace, warn};

/// State shared by the waiter, its handles and its pending timer tasks.
pub(crate) struct Shared {
    table: KeyTable,
    config: WaiterConfig,
    observer: Option<Arc<dyn FailureObserver>>,
    stats: WaiterStats,
    next_id: AtomicU64,
}

impl Shared {
    fn new(config: WaiterConfig, observer: Option<Arc<dyn FailureObserver>>) -> Self {
        Self {
            table: KeyTable::new(),
            config,
            observer,
            stats: WaiterStats::default(),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> WaitId {
        WaitId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn expiry_task(self: &Arc<Self>, set: Arc<WaiterSet>, id: WaitId) -> Task {
        let shared = Arc::clone(self);
        Box::new(move || shared.expire(&set, id))
    }

    /// Timer side of the race.
    fn expire(&self, set: &Arc<WaiterSet>, id: WaitId) {
        let Some(record) = set.take(id) else {
            trace!(key = %set.key(), id = %id, "timer fired after wait completed");
            return;
        };
        self.stats.expired();
        self.settle(set);
        debug!(key = %set.key(), id = %id, "wait expired");

        if let Some(action) = record.claim_timeout() {
            self.guarded(set.key(), id, Stage::Timeout, action);
        }
    }

    /// Dispatch side of the race.
    fn dispatch(&self, key: &DispatchKey, event: &dyn Any) -> usize {
        let Some(set) = self.table.get(key) else {
            return 0;
        };

        let snapshot = set.snapshot();
        let considered = snapshot.len();
        let mut fired = 0;
        for (id, condition) in snapshot {
            let hit = self
                .guarded(*key, id, Stage::Condition, || condition(event))
                .unwrap_or(false);
            if !hit {
                continue;
            }
            // Losing here means the timer or a cancel got it first.
            let Some(record) = set.take(id) else {
                continue;
            };
            self.stats.matched();
            fired += 1;

            let action = record.claim_match();
            self.guarded(*key, id, Stage::Match, || action(event));
        }

        if fired > 0 {
            self.settle(&set);
        }
        trace!(key = %key, considered, fired, "dispatched");
        fired
    }

    pub(crate) fn cancelled(&self, set: &Arc<WaiterSet>) {
        self.stats.cancelled();
        self.settle(set);
    }

    /// Called after a record left `set`.
    fn settle(&self, set: &Arc<WaiterSet>) {
        if self.config.prune_empty && set.is_empty() && self.table.prune_if_empty(set) {
            debug!(key = %set.key(), "pruned empty waiter set");
        }
    }

    fn guarded<R>(
        &self,
        key: DispatchKey,
        id: WaitId,
        stage: Stage,
        callback: impl FnOnce() -> R,
    ) -> Option<R> {
        if !self.config.isolate_callbacks {
            return Some(callback());
        }
        match panic::catch_unwind(AssertUnwindSafe(callback)) {
            Ok(value) => Some(value),
            Err(payload) => {
                self.report(CallbackFailure::new(
                    key,
                    id,
                    stage,
                    panic_message(payload.as_ref()),
                ));
                None
            }
        }
    }

    fn report(&self, failure: CallbackFailure) {
        self.stats.callback_failed();
        error!(
            key = %failure.key(),
            id = %failure.id(),
            stage = %failure.stage(),
            "waiter callback panicked: {}",
            failure.message()
        );
        if let Some(observer) = &self.observer {
            observer.on_failure(&failure);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A thread-safe registry of one-shot conditional waits.
///
/// Callers register interest in the next event of some type that satisfies a
/// condition, optionally bounded by a timeout. Each registration receives
/// exactly one callback: the match action if a dispatched event satisfies
/// the condition first, or the timeout action if the deadline passes first.
///
/// # Example
///
/// ```rust,ignore
/// let waiter = EventWaiter::new();
///
/// waiter
///     .wait_for::<ChatMessage>()
///     .when(|m: &ChatMessage| m.author == "alice")
///     .then(|m: &ChatMessage| println!("alice said {}", m.text))
///     .timeout(Duration::from_secs(30))
///     .on_timeout(|| println!("alice stayed quiet"))
///     .register()?;
///
/// // Somewhere in the host's event loop:
/// waiter.dispatch(&message, None);
/// ```
///
/// # Lifecycle
///
/// [`shutdown`](EventWaiter::shutdown) (also run on drop) only stops new
/// registrations. Waits already registered keep matching dispatched events
/// and their timers still fire.
pub struct EventWaiter {
    shared: Arc<Shared>,
    scheduler: Arc<dyn Scheduler>,
    owns_scheduler: bool,
    closed: AtomicBool,
}

impl EventWaiter {
    /// Create a waiter with default settings and its own timer thread.
    ///
    /// # Panics
    ///
    /// Panics if the timer thread cannot be spawned. Use
    /// [`EventWaiter::builder`] to handle that case.
    pub fn new() -> Self {
        Self::builder()
            .build()
            .expect("failed to spawn tarry timer thread")
    }

    /// Create a waiter that schedules timeouts on a shared scheduler.
    ///
    /// The waiter never shuts a shared scheduler down.
    pub fn with_scheduler(scheduler: Arc<dyn Scheduler>) -> Self {
        Self::from_parts(WaiterConfig::default(), None, scheduler, false)
    }

    /// Start configuring a waiter.
    pub fn builder() -> EventWaiterBuilder {
        EventWaiterBuilder::new()
    }

    fn from_parts(
        config: WaiterConfig,
        observer: Option<Arc<dyn FailureObserver>>,
        scheduler: Arc<dyn Scheduler>,
        owns_scheduler: bool,
    ) -> Self {
        Self {
            shared: Arc::new(Shared::new(config, observer)),
            scheduler,
            owns_scheduler,
            closed: AtomicBool::new(false),
        }
    }

    /// Start building a wait for events of type `E`.
    pub fn wait_for<E: Message>(&self) -> WaitBuilder<'_, E> {
        WaitBuilder::new(self)
    }

    /// Wait without a timeout for the next event under `key` satisfying
    /// `condition`.
    pub fn register<E, C, A>(
        &self,
        key: DispatchKey,
        condition: C,
        on_match: A,
    ) -> Result<WaitHandle, WaitError>
    where
        E: Message,
        C: Condition<E>,
        A: FnOnce(&E) + Send + 'static,
    {
        let mut registration = Registration::new(key, EventKind::of::<E>());
        registration.condition = Some(erase_condition(condition));
        registration.on_match = Some(erase_action(on_match));
        self.submit(registration)
    }

    /// Wait up to `timeout` for the next event under `key` satisfying
    /// `condition`, running `on_timeout` if none arrives in time.
    ///
    /// A zero `timeout` waits indefinitely and `on_timeout` never runs.
    pub fn register_with_timeout<E, C, A, T>(
        &self,
        key: DispatchKey,
        condition: C,
        on_match: A,
        timeout: Duration,
        on_timeout: T,
    ) -> Result<WaitHandle, WaitError>
    where
        E: Message,
        C: Condition<E>,
        A: FnOnce(&E) + Send + 'static,
        T: FnOnce() + Send + 'static,
    {
        let mut registration = Registration::new(key, EventKind::of::<E>());
        registration.condition = Some(erase_condition(condition));
        registration.on_match = Some(erase_action(on_match));
        registration.timeout = Some(timeout);
        registration.on_timeout = Some(Box::new(on_timeout));
        self.submit(registration)
    }

    pub(crate) fn submit(&self, registration: Registration) -> Result<WaitHandle, WaitError> {
        let Registration {
            key,
            kind,
            condition,
            on_match,
            timeout,
            on_timeout,
        } = registration;

        if key.kind() != kind {
            return Err(WaitError::invalid(format!(
                "key {key} does not carry events of type {kind}"
            )));
        }
        let condition = condition.ok_or_else(|| WaitError::invalid("missing condition"))?;
        let on_match = on_match.ok_or_else(|| WaitError::invalid("missing match action"))?;

        if self.is_closed() {
            warn!(key = %key, "registration rejected: waiter is closed");
            return Err(WaitError::Closed);
        }

        let shared = &self.shared;
        let id = shared.next_id();
        let set = shared
            .table
            .insert(&key, WaitRecord::new(id, condition, on_match, on_timeout));
        shared.stats.registered();

        let delay = timeout.filter(|delay| !delay.is_zero());
        if let Some(delay) = delay {
            match self.scheduler.schedule(delay, shared.expiry_task(Arc::clone(&set), id)) {
                Ok(timer) => set.attach_timer(id, timer),
                Err(err) => {
                    // A dispatch may already have matched it; then the wait
                    // completed and the handle is still valid.
                    if let Some(record) = set.take(id) {
                        record.discard();
                        shared.stats.unregistered();
                        shared.settle(&set);
                        warn!(key = %key, id = %id, "registration rejected: {err}");
                        return Err(err.into());
                    }
                }
            }
        }

        debug!(key = %key, id = %id, timeout = ?delay, "wait registered");
        Ok(WaitHandle::new(id, set, Arc::downgrade(shared)))
    }

    /// Offer `event` to the waits registered under its type and `priority`.
    ///
    /// Runs the match action of every wait whose condition holds, on the
    /// calling thread, and returns how many ran.
    pub fn dispatch<E: Message>(&self, event: &E, priority: Option<Priority>) -> usize {
        let key = DispatchKey::new(EventKind::of::<E>(), priority);
        self.shared.dispatch(&key, event)
    }

    /// Offer `event` to the waits registered under `key`.
    ///
    /// Fails with [`WaitError::InvalidArgument`] if `key` is not a key for
    /// events of type `E`.
    pub fn dispatch_key<E: Message>(
        &self,
        key: &DispatchKey,
        event: &E,
    ) -> Result<usize, WaitError> {
        if !key.kind().is::<E>() {
            return Err(WaitError::invalid(format!(
                "key {key} does not carry events of type {}",
                EventKind::of::<E>()
            )));
        }
        Ok(self.shared.dispatch(key, event))
    }

    /// Offer one occurrence of `event` under the tier-less key and then under
    /// every [`Priority`] in firing order.
    pub fn dispatch_all_priorities<E: Message>(&self, event: &E) -> usize {
        std::iter::once(None)
            .chain(Priority::ALL.into_iter().map(Some))
            .map(|priority| self.dispatch(event, priority))
            .sum()
    }

    /// Number of waits pending under `key`.
    pub fn pending(&self, key: &DispatchKey) -> usize {
        self.shared.table.pending(key)
    }

    /// Number of waits pending under any key.
    pub fn pending_total(&self) -> usize {
        self.shared.table.pending_total()
    }

    /// Keys that currently have a waiter set.
    pub fn keys(&self) -> Vec<DispatchKey> {
        self.shared.table.keys()
    }

    /// Drop every empty waiter set. Returns how many were dropped.
    ///
    /// Only needed when [`WaiterConfig::prune_empty`] is off.
    pub fn prune(&self) -> usize {
        let pruned = self.shared.table.prune();
        if pruned > 0 {
            debug!(pruned, "pruned empty waiter sets");
        }
        pruned
    }

    /// Counters since creation.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// The waiter's settings.
    pub fn config(&self) -> &WaiterConfig {
        &self.shared.config
    }

    /// Returns `true` if the waiter created its scheduler itself.
    pub fn owns_scheduler(&self) -> bool {
        self.owns_scheduler
    }

    /// Returns `true` once registrations are rejected.
    ///
    /// That is after [`shutdown`](EventWaiter::shutdown), or once the
    /// scheduler stopped accepting work.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.scheduler.is_shutdown()
    }

    /// Reject all further registrations.
    ///
    /// Shuts down the scheduler if the waiter owns it. Pending waits are left
    /// alone: they can still match, and their timers still fire.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!(
            pending = self.pending_total(),
            owns_scheduler = self.owns_scheduler,
            "event waiter shut down"
        );
        if self.owns_scheduler {
            self.scheduler.shutdown();
        }
    }
}

impl Default for EventWaiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventWaiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for EventWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventWaiter")
            .field("keys", &self.shared.table.len())
            .field("pending", &self.pending_total())
            .field("owns_scheduler", &self.owns_scheduler)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Builder for constructing an [`EventWaiter`].
///
/// # Example
/// ```ignore
/// let waiter = EventWaiter::builder()
///     .thread_name("quest-timeouts")
///     .failure_observer(|failure: &CallbackFailure| metrics.count(failure))
///     .build()?;
/// ```
pub struct EventWaiterBuilder {
    config: WaiterConfig,
    scheduler: Option<Arc<dyn Scheduler>>,
    observer: Option<Arc<dyn FailureObserver>>,
}

impl EventWaiterBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: WaiterConfig::default(),
            scheduler: None,
            observer: None,
        }
    }

    /// Replace all settings at once.
    pub fn config(mut self, config: WaiterConfig) -> Self {
        self.config = config;
        self
    }

    /// Schedule timeouts on a shared scheduler instead of an owned thread.
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Name of the owned timer thread.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// See [`WaiterConfig::prune_empty`].
    pub fn prune_empty(mut self, prune: bool) -> Self {
        self.config.prune_empty = prune;
        self
    }

    /// See [`WaiterConfig::isolate_callbacks`].
    pub fn isolate_callbacks(mut self, isolate: bool) -> Self {
        self.config.isolate_callbacks = isolate;
        self
    }

    /// Receive callback failures in addition to the `tracing` log.
    pub fn failure_observer(mut self, observer: impl FailureObserver) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Build the waiter, spawning its timer thread unless a shared scheduler
    /// was supplied.
    pub fn build(self) -> Result<EventWaiter, TarryError> {
        let (scheduler, owns_scheduler): (Arc<dyn Scheduler>, bool) = match self.scheduler {
            Some(shared) => (shared, false),
            None => {
                let owned = ThreadScheduler::try_named(&self.config.thread_name)
                    .map_err(TarryError::Spawn)?;
                (Arc::new(owned), true)
            }
        };
        Ok(EventWaiter::from_parts(
            self.config,
            self.observer,
            scheduler,
            owns_scheduler,
        ))
    }
}

impl Default for EventWaiterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
