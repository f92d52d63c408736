//! # tarry-std
//!
//! Standard implementations for the Tarry conditional wait registry.
//!
//! This crate provides:
//! - **Waiter**: [`EventWaiter`](waiter::EventWaiter), [`WaitBuilder`](waiter::WaitBuilder), [`WaitHandle`](waiter::WaitHandle)
//! - **Schedulers**: [`ThreadScheduler`](scheduler::ThreadScheduler), and `TokioScheduler` behind the `tokio` feature
//! - **Failure observation**: [`FailureObserver`](observe::FailureObserver), [`LoggingObserver`](observe::LoggingObserver)
//! - **Testing**: [`ManualScheduler`](testing::ManualScheduler) and call recorders

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use tarry_core;

// Modules
pub mod observe;
pub mod scheduler;
pub mod testing;
pub mod waiter;
