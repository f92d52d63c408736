//! The unit of registration.

use std::{any::Any, fmt, sync::Arc};
use tarry_core::{Condition, Message, TimerHandle, WaitId};

/// Type-erased condition, shared between the live record and dispatch snapshots.
pub(crate) type ErasedCondition = dyn Fn(&dyn Any) -> bool + Send + Sync;

/// Type-erased match action.
pub(crate) type MatchAction = Box<dyn FnOnce(&dyn Any) + Send>;

/// Action run when a wait expires.
pub(crate) type TimeoutAction = Box<dyn FnOnce() + Send>;

pub(crate) fn erase_condition<E, C>(condition: C) -> Arc<ErasedCondition>
where
    E: Message,
    C: Condition<E>,
{
    Arc::new(move |event: &dyn Any| {
        event
            .downcast_ref::<E>()
            .is_some_and(|event| condition.test(event))
    })
}

pub(crate) fn erase_action<E, A>(action: A) -> MatchAction
where
    E: Message,
    A: FnOnce(&E) + Send + 'static,
{
    Box::new(move |event: &dyn Any| {
        if let Some(event) = event.downcast_ref::<E>() {
            action(event);
        }
    })
}

/// One pending wait.
///
/// A record lives inside exactly one [`WaiterSet`] until someone takes it
/// out. Whoever takes it owns its callbacks: the actions are `FnOnce` and are
/// moved out by the `claim_*` methods, so a record can fire at most once.
///
/// [`WaiterSet`]: super::WaiterSet
pub struct WaitRecord {
    id: WaitId,
    condition: Arc<ErasedCondition>,
    on_match: MatchAction,
    on_timeout: Option<TimeoutAction>,
    timer: Option<TimerHandle>,
}

impl WaitRecord {
    pub(crate) fn new(
        id: WaitId,
        condition: Arc<ErasedCondition>,
        on_match: MatchAction,
        on_timeout: Option<TimeoutAction>,
    ) -> Self {
        Self {
            id,
            condition,
            on_match,
            on_timeout,
            timer: None,
        }
    }

    /// The record's id.
    pub fn id(&self) -> WaitId {
        self.id
    }

    /// Returns `true` if a timeout action was supplied.
    pub fn has_timeout_action(&self) -> bool {
        self.on_timeout.is_some()
    }

    /// Returns `true` if a timer is attached.
    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    pub(crate) fn condition(&self) -> &Arc<ErasedCondition> {
        &self.condition
    }

    pub(crate) fn set_timer(&mut self, timer: TimerHandle) {
        self.timer = Some(timer);
    }

    /// Won by a dispatch: the pending timer is no longer needed.
    pub(crate) fn claim_match(mut self) -> MatchAction {
        self.cancel_timer();
        self.on_match
    }

    /// Won by the timer.
    pub(crate) fn claim_timeout(self) -> Option<TimeoutAction> {
        self.on_timeout
    }

    /// Won by a manual cancel: nothing fires.
    pub(crate) fn discard(mut self) {
        self.cancel_timer();
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

impl fmt::Debug for WaitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitRecord")
            .field("id", &self.id)
            .field("has_timeout_action", &self.has_timeout_action())
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}
