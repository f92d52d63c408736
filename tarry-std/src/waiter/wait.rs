//! Builder for a single wait.

use super::{
    handle::WaitHandle,
    record::{ErasedCondition, MatchAction, TimeoutAction, erase_action, erase_condition},
    registry::EventWaiter,
};
use std::{marker::PhantomData, sync::Arc, time::Duration};
use tarry_core::{Condition, DispatchKey, EventKind, Message, Priority, WaitError};

/// Everything a registration carries before validation.
pub(crate) struct Registration {
    pub(crate) key: DispatchKey,
    /// Kind of the payload the callbacks were written for.
    pub(crate) kind: EventKind,
    pub(crate) condition: Option<Arc<ErasedCondition>>,
    pub(crate) on_match: Option<MatchAction>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) on_timeout: Option<TimeoutAction>,
}

impl Registration {
    pub(crate) fn new(key: DispatchKey, kind: EventKind) -> Self {
        Self {
            key,
            kind,
            condition: None,
            on_match: None,
            timeout: None,
            on_timeout: None,
        }
    }
}

/// Builder for one wait on events of type `E`.
///
/// Created by [`EventWaiter::wait_for`]. A condition and a match action are
/// required; [`register`](WaitBuilder::register) fails with
/// [`WaitError::InvalidArgument`] if either is missing.
///
/// # Example
///
/// ```rust,ignore
/// let handle = waiter
///     .wait_for::<BlockPlace>()
///     .priority(Priority::Monitor)
///     .when(|e: &BlockPlace| e.player == player)
///     .then(move |e: &BlockPlace| quest.advance(e))
///     .timeout(Duration::from_secs(60))
///     .on_timeout(move || quest.fail())
///     .register()?;
/// ```
#[must_use = "a wait is only registered once `register` is called"]
pub struct WaitBuilder<'w, E: Message> {
    waiter: &'w EventWaiter,
    registration: Registration,
    _event: PhantomData<fn(&E)>,
}

impl<'w, E: Message> WaitBuilder<'w, E> {
    pub(crate) fn new(waiter: &'w EventWaiter) -> Self {
        Self {
            waiter,
            registration: Registration::new(DispatchKey::of::<E>(), EventKind::of::<E>()),
            _event: PhantomData,
        }
    }

    /// Only match events dispatched under `priority`.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.registration.key = self.registration.key.with_priority(Some(priority));
        self
    }

    /// Register under an explicit key. The key must be a key for `E`.
    pub fn key(mut self, key: DispatchKey) -> Self {
        self.registration.key = key;
        self
    }

    /// The condition an event must satisfy.
    pub fn when(mut self, condition: impl Condition<E>) -> Self {
        self.registration.condition = Some(erase_condition(condition));
        self
    }

    /// The action run with the first matching event.
    pub fn then(mut self, on_match: impl FnOnce(&E) + Send + 'static) -> Self {
        self.registration.on_match = Some(erase_action(on_match));
        self
    }

    /// Give up after `timeout`. Zero waits indefinitely.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.registration.timeout = Some(timeout);
        self
    }

    /// The action run if the timeout passes first.
    pub fn on_timeout(mut self, on_timeout: impl FnOnce() + Send + 'static) -> Self {
        self.registration.on_timeout = Some(Box::new(on_timeout));
        self
    }

    /// Register the wait.
    pub fn register(self) -> Result<WaitHandle, WaitError> {
        self.waiter.submit(self.registration)
    }
}
