#![allow(dead_code)]

use std::sync::Arc;
use tarry::{EventWaiter, Message, testing::ManualScheduler};

// ============================================================================
// Test Event Types
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Chat {
    pub author: String,
    pub text: String,
}

impl Chat {
    pub fn new(author: &str, text: &str) -> Self {
        Self {
            author: author.to_string(),
            text: text.to_string(),
        }
    }
}

impl Message for Chat {}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockBreak {
    pub player: u32,
    pub block: &'static str,
}

impl Message for BlockBreak {}

// ============================================================================
// Setup
// ============================================================================

/// A waiter driven by a virtual clock.
pub fn manual_waiter() -> (Arc<ManualScheduler>, EventWaiter) {
    let scheduler = Arc::new(ManualScheduler::new());
    let waiter = EventWaiter::with_scheduler(scheduler.clone());
    (scheduler, waiter)
}

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
