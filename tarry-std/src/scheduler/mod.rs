//! Schedulers shipped with Tarry.
//!
//! - [`ThreadScheduler`]: one dedicated timer thread, the default
//! - `TokioScheduler`: tasks on a host tokio runtime (feature `tokio`)
//!
//! [`ManualScheduler`](crate::testing::ManualScheduler) lives in
//! [`testing`](crate::testing).

mod thread;
#[cfg(feature = "tokio")]
mod runtime;

pub use self::thread::ThreadScheduler;
#[cfg(feature = "tokio")]
pub use self::runtime::TokioScheduler;
