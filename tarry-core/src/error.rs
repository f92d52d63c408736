//! Error types for Tarry.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`TarryError`] - Top-level error type for all Tarry operations
//! - [`WaitError`] - Errors surfaced to callers registering or dispatching
//! - [`ScheduleError`] - Errors from a [`Scheduler`](crate::Scheduler)
//! - [`CallbackFailure`] - A user callback that panicked, reported to observers

use crate::key::{DispatchKey, WaitId};
use std::fmt;
use thiserror::Error;

/// Top-level error type for all Tarry operations.
#[derive(Error, Debug)]
pub enum TarryError {
    /// A registration or dispatch was rejected.
    #[error("wait error: {0}")]
    Wait(#[from] WaitError),

    /// A scheduler rejected work.
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// The owned timer thread could not be started.
    #[error("failed to spawn timer thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Errors returned from registration and dispatch.
#[derive(Error, Debug)]
pub enum WaitError {
    /// A required argument was missing or inconsistent. This is a
    /// programming error at the call site.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The waiter was shut down and no longer accepts registrations.
    #[error("event waiter is closed")]
    Closed,
}

impl WaitError {
    /// Shorthand for [`WaitError::InvalidArgument`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        WaitError::InvalidArgument(reason.into())
    }
}

/// Errors returned by a [`Scheduler`](crate::Scheduler).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// The scheduler stopped accepting work.
    #[error("scheduler has been shut down")]
    Shutdown,
}

/// Which user callback failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The waiter's condition.
    Condition,
    /// The action run on a match.
    Match,
    /// The action run on timeout.
    Timeout,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Condition => "condition",
            Stage::Match => "match action",
            Stage::Timeout => "timeout action",
        })
    }
}

/// A user callback panicked while the waiter ran it.
///
/// The registrant is no longer on the call stack when this happens, so the
/// failure is handed to the waiter's failure observer and logged instead of
/// being returned.
#[derive(Error, Debug, Clone)]
#[error("{stage} of waiter {id} on {key} panicked: {message}")]
pub struct CallbackFailure {
    key: DispatchKey,
    id: WaitId,
    stage: Stage,
    message: String,
}

impl CallbackFailure {
    /// Create a failure record.
    pub fn new(key: DispatchKey, id: WaitId, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            key,
            id,
            stage,
            message: message.into(),
        }
    }

    /// Key the failing waiter was registered under.
    pub fn key(&self) -> DispatchKey {
        self.key
    }

    /// Id of the failing waiter.
    pub fn id(&self) -> WaitId {
        self.id
    }

    /// Which callback failed.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The panic message, if it was a string.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ScheduleError> for WaitError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Shutdown => WaitError::Closed,
        }
    }
}
