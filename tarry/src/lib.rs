//! # tarry - Conditional Event Waits
//!
//! `tarry` lets code that reacts to events say "run this the next time an
//! event of type `E` satisfying `condition` arrives, or run that if none
//! arrives within `timeout`", without writing a permanent listener for a
//! one-shot interest.
//!
//! Every wait gets exactly one callback. Dispatch, timer expiry and manual
//! cancel race for each wait, and exactly one of them wins.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tarry::prelude::*;
//! use std::time::Duration;
//!
//! #[derive(Message)]
//! struct BlockBreak { player: String, block: String }
//!
//! let waiter = EventWaiter::new();
//!
//! waiter
//!     .wait_for::<BlockBreak>()
//!     .priority(Priority::Monitor)
//!     .when(|e: &BlockBreak| e.player == "alice")
//!     .then(|e: &BlockBreak| println!("alice broke {}", e.block))
//!     .timeout(Duration::from_secs(60))
//!     .on_timeout(|| println!("alice took too long"))
//!     .register()?;
//!
//! // In the host's event handler for the Monitor tier:
//! waiter.dispatch(&event, Some(Priority::Monitor));
//! ```
//!
//! ## Crates
//!
//! - `tarry-core`: keys, conditions, the [`Scheduler`] trait and errors
//! - `tarry-std`: [`EventWaiter`], the shipped schedulers and test utilities
//! - `tarry-macros`: `#[derive(Message)]` (feature `macros`)

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use tarry_core::{
    // Conditions
    Always,
    And,
    // Errors
    CallbackFailure,
    // Scheduling
    Cancel,
    CancelFlag,
    Condition,
    // Keys
    DispatchKey,
    EventKind,
    // Message
    Message,
    Not,
    Or,
    Priority,
    ScheduleError,
    Scheduler,
    Stage,
    TarryError,
    Task,
    TimerHandle,
    WaitError,
    WaitId,
};

// Waiter
pub use tarry_std::waiter::{
    EventWaiter, EventWaiterBuilder, StatsSnapshot, WaitBuilder, WaitHandle, WaitRecord,
    WaiterConfig, WaiterSet,
};

/// Schedulers shipped with Tarry.
pub mod scheduler {
    #![allow(clippy::wildcard_imports)]
    pub use tarry_std::scheduler::*;
}

/// Callback failure observation.
pub mod observe {
    #![allow(clippy::wildcard_imports)]
    pub use tarry_std::observe::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use tarry_std::testing::*;
}

/// Prelude module - common imports for Tarry.
///
/// # Usage
///
/// ```rust,ignore
/// use tarry::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Conditions
        Always,
        Condition,
        // Keys
        DispatchKey,
        // Waiter
        EventWaiter,
        Message,
        Priority,
        // Errors
        TarryError,
        WaitError,
        WaitHandle,
    };
}

#[cfg(feature = "macros")]
pub use tarry_macros::Message;
