//! Conditional one-shot waits.
//!
//! [`EventWaiter`] owns a table mapping each
//! [`DispatchKey`](tarry_core::DispatchKey) to a [`WaiterSet`]. A wait is a
//! [`WaitRecord`] inside one set. Dispatch, timer expiry and manual cancel
//! all complete a wait by taking its record out of the set, and only one of
//! them can.

mod config;
mod handle;
mod record;
mod registry;
mod set;
mod stats;
mod table;
mod wait;

pub use config::WaiterConfig;
pub use handle::WaitHandle;
pub use record::WaitRecord;
pub use registry::{EventWaiter, EventWaiterBuilder};
pub use set::WaiterSet;
pub use stats::StatsSnapshot;
pub use wait::WaitBuilder;
