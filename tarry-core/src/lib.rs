//! # tarry-core
//!
//! Core types and traits for the Tarry conditional event waiter.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! hosts and scheduler integrations that don't need the full `tarry-std`
//! implementation.
//!
//! # Building Blocks
//!
//! ## Events ([`Message`])
//!
//! Any `Send + Sync + 'static` type marked as a [`Message`] can be waited on.
//! The payload type is the event-type half of a [`DispatchKey`]; hosts that
//! fire events in phases add a [`Priority`] tier as the other half.
//!
//! ## Conditions ([`Condition`])
//!
//! A predicate over one event type. Closures are conditions; the
//! `and`/`or`/`not` combinators compose them.
//!
//! ## Deferred execution ([`Scheduler`])
//!
//! The facility that fires timeouts. It may be owned by a waiter or shared
//! with the host, and only needs to run a [`Task`] once after a delay.
//!
//! # Error Types
//!
//! - [`TarryError`] - Top-level error type
//! - [`WaitError`] - Registration and dispatch errors
//! - [`ScheduleError`] - Scheduler errors
//! - [`CallbackFailure`] - Panicking user callbacks

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod condition;
mod error;
mod key;
mod message;
mod scheduler;

// Re-exports
pub use condition::{Always, And, Condition, Not, Or};
pub use error::{CallbackFailure, ScheduleError, Stage, TarryError, WaitError};
pub use key::{DispatchKey, EventKind, Priority, WaitId};
pub use message::Message;
pub use scheduler::{Cancel, CancelFlag, Scheduler, Task, TimerHandle};
