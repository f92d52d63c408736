//! # Conditions
//!
//! A [`Condition`] decides whether an event occurrence satisfies a waiter.
//! Plain closures `Fn(&E) -> bool` are conditions; the combinators on the
//! trait build larger predicates declaratively:
//!
//! ```rust,ignore
//! let mined_by_alice = (|e: &BlockBreak| e.player == "alice")
//!     .and(|e: &BlockBreak| e.block == "diamond_ore")
//!     .and(not_cancelled.not());
//! ```
//!
//! Conditions run on the dispatching thread with no registry lock held. They
//! should be cheap and side-effect free; a condition that registers or
//! cancels other waiters is allowed but makes the outcome depend on
//! dispatch interleaving.

use crate::message::Message;

/// A predicate over events of type `E`.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Condition` over `{E}`",
    label = "expected `Fn(&{E}) -> bool`",
    note = "Use a closure `|event: &{E}| ...` returning `bool`, or implement `Condition<{E}>`."
)]
pub trait Condition<E: Message>: Send + Sync + 'static {
    /// Returns `true` if `event` satisfies the condition.
    fn test(&self, event: &E) -> bool;

    /// Both conditions must hold. `other` is not evaluated if `self` fails.
    fn and<C>(self, other: C) -> And<Self, C>
    where
        Self: Sized,
        C: Condition<E>,
    {
        And {
            first: self,
            second: other,
        }
    }

    /// Either condition must hold. `other` is not evaluated if `self` holds.
    fn or<C>(self, other: C) -> Or<Self, C>
    where
        Self: Sized,
        C: Condition<E>,
    {
        Or {
            first: self,
            second: other,
        }
    }

    /// Negates the condition.
    fn not(self) -> Not<Self>
    where
        Self: Sized,
    {
        Not { inner: self }
    }
}

impl<E, F> Condition<E> for F
where
    E: Message,
    F: Fn(&E) -> bool + Send + Sync + 'static,
{
    fn test(&self, event: &E) -> bool {
        self(event)
    }
}

/// Condition satisfied by every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl<E: Message> Condition<E> for Always {
    fn test(&self, _event: &E) -> bool {
        true
    }
}

/// Conjunction built by [`Condition::and`].
#[derive(Debug, Clone, Copy)]
pub struct And<A, B> {
    first: A,
    second: B,
}

impl<E, A, B> Condition<E> for And<A, B>
where
    E: Message,
    A: Condition<E>,
    B: Condition<E>,
{
    fn test(&self, event: &E) -> bool {
        self.first.test(event) && self.second.test(event)
    }
}

/// Disjunction built by [`Condition::or`].
#[derive(Debug, Clone, Copy)]
pub struct Or<A, B> {
    first: A,
    second: B,
}

impl<E, A, B> Condition<E> for Or<A, B>
where
    E: Message,
    A: Condition<E>,
    B: Condition<E>,
{
    fn test(&self, event: &E) -> bool {
        self.first.test(event) || self.second.test(event)
    }
}

/// Negation built by [`Condition::not`].
#[derive(Debug, Clone, Copy)]
pub struct Not<C> {
    inner: C,
}

impl<E, C> Condition<E> for Not<C>
where
    E: Message,
    C: Condition<E>,
{
    fn test(&self, event: &E) -> bool {
        !self.inner.test(event)
    }
}
