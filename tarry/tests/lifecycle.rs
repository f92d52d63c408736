//! Registration, matching, timeout and shutdown behavior of a single waiter.

mod common;

use common::{BlockBreak, Chat, manual_waiter};
use std::{
    sync::{Arc, mpsc},
    time::{Duration, Instant},
};
use tarry::{
    DispatchKey, EventWaiter, Priority, Scheduler, WaitError,
    testing::{CallLog, Counter},
};

#[test]
fn each_wait_receives_exactly_one_match() {
    common::init_tracing();
    let (_, waiter) = manual_waiter();
    let log = CallLog::new();

    for name in ["alice", "bob"] {
        let log = log.clone();
        waiter
            .wait_for::<Chat>()
            .when(move |c: &Chat| c.author == name)
            .then(move |c: &Chat| log.push(c.text.clone()))
            .register()
            .unwrap();
    }

    assert_eq!(waiter.dispatch(&Chat::new("carol", "hi"), None), 0);
    assert_eq!(waiter.dispatch(&Chat::new("alice", "first"), None), 1);
    assert_eq!(waiter.dispatch(&Chat::new("alice", "second"), None), 0);
    assert_eq!(waiter.dispatch(&Chat::new("bob", "third"), None), 1);

    assert_eq!(log.entries(), vec!["first".to_string(), "third".to_string()]);
    assert_eq!(waiter.pending_total(), 0);
}

#[test]
fn one_event_completes_every_satisfied_wait() {
    let (_, waiter) = manual_waiter();
    let hits = Counter::new();
    for _ in 0..5 {
        let h = hits.clone();
        waiter
            .register(
                DispatchKey::of::<BlockBreak>(),
                |e: &BlockBreak| e.block == "stone",
                move |_: &BlockBreak| h.increment(),
            )
            .unwrap();
    }
    let event = BlockBreak {
        player: 1,
        block: "stone",
    };
    assert_eq!(waiter.dispatch(&event, None), 5);
    assert_eq!(hits.count(), 5);
}

#[test]
fn matches_run_in_registration_order() {
    let (_, waiter) = manual_waiter();
    let order = CallLog::new();
    for n in 0..4u32 {
        let order = order.clone();
        waiter
            .register(
                DispatchKey::of::<BlockBreak>(),
                |_: &BlockBreak| true,
                move |_: &BlockBreak| order.push(n),
            )
            .unwrap();
    }
    waiter.dispatch(
        &BlockBreak {
            player: 0,
            block: "dirt",
        },
        None,
    );
    assert_eq!(order.entries(), vec![0, 1, 2, 3]);
}

#[test]
fn keys_are_isolated() {
    let (_, waiter) = manual_waiter();
    let hits = Counter::new();
    let h = hits.clone();
    waiter
        .register(
            DispatchKey::of::<Chat>(),
            |_: &Chat| true,
            move |_: &Chat| h.increment(),
        )
        .unwrap();

    // Another type, and the same type under a priority tier.
    let event = BlockBreak {
        player: 7,
        block: "sand",
    };
    assert_eq!(waiter.dispatch(&event, None), 0);
    assert_eq!(waiter.dispatch(&Chat::new("a", "b"), Some(Priority::Normal)), 0);
    assert_eq!(hits.count(), 0);
    assert_eq!(waiter.pending(&DispatchKey::of::<Chat>()), 1);
    assert_eq!(waiter.pending(&DispatchKey::at::<Chat>(Priority::Normal)), 0);
}

#[test]
fn timeout_fires_at_deadline_and_not_before() {
    let (scheduler, waiter) = manual_waiter();
    let fired = Counter::new();
    let t = fired.clone();
    let handle = waiter
        .register_with_timeout(
            DispatchKey::of::<Chat>(),
            |c: &Chat| c.text == "never",
            |_: &Chat| {},
            Duration::from_secs(10),
            move || t.increment(),
        )
        .unwrap();

    scheduler.advance(Duration::from_millis(9_999));
    assert_eq!(fired.count(), 0);
    assert!(handle.is_pending());

    scheduler.advance(Duration::from_millis(1));
    assert_eq!(fired.count(), 1);
    assert!(!handle.is_pending());

    // A later matching event finds nothing.
    assert_eq!(waiter.dispatch(&Chat::new("x", "never"), None), 0);
    assert_eq!(waiter.stats().expired, 1);
}

#[test]
fn match_preempts_timeout() {
    let (scheduler, waiter) = manual_waiter();
    let matched = Counter::new();
    let timed_out = Counter::new();
    let (m, t) = (matched.clone(), timed_out.clone());
    waiter
        .wait_for::<Chat>()
        .when(|c: &Chat| c.author == "alice")
        .then(move |_| m.increment())
        .timeout(Duration::from_secs(5))
        .on_timeout(move || t.increment())
        .register()
        .unwrap();

    scheduler.advance(Duration::from_secs(4));
    assert_eq!(waiter.dispatch(&Chat::new("alice", "made it"), None), 1);
    scheduler.run_all();

    assert_eq!(matched.count(), 1);
    assert_eq!(timed_out.count(), 0);
    assert_eq!(scheduler.pending(), 0);
}

#[test]
fn timeout_preempts_later_match() {
    let (scheduler, waiter) = manual_waiter();
    let matched = Counter::new();
    let timed_out = Counter::new();
    let (m, t) = (matched.clone(), timed_out.clone());
    waiter
        .register_with_timeout(
            DispatchKey::of::<Chat>(),
            |_: &Chat| true,
            move |_: &Chat| m.increment(),
            Duration::from_secs(1),
            move || t.increment(),
        )
        .unwrap();

    scheduler.advance(Duration::from_secs(1));
    assert_eq!(waiter.dispatch(&Chat::new("late", "too late"), None), 0);
    assert_eq!((matched.count(), timed_out.count()), (0, 1));
}

#[test]
fn timeout_without_action_just_removes_the_wait() {
    let (scheduler, waiter) = manual_waiter();
    waiter
        .wait_for::<Chat>()
        .when(|_: &Chat| false)
        .then(|_| {})
        .timeout(Duration::from_millis(10))
        .register()
        .unwrap();
    assert_eq!(waiter.pending_total(), 1);
    scheduler.advance(Duration::from_millis(10));
    assert_eq!(waiter.pending_total(), 0);
    assert!(waiter.keys().is_empty());
}

#[test]
fn timeout_action_may_register_again() {
    let (scheduler, waiter) = manual_waiter();
    let waiter = Arc::new(waiter);
    let retries = Counter::new();

    let again = {
        let waiter = waiter.clone();
        let retries = retries.clone();
        move || {
            retries.increment();
            waiter
                .register(DispatchKey::of::<Chat>(), |_: &Chat| true, |_: &Chat| {})
                .unwrap();
        }
    };
    waiter
        .register_with_timeout(
            DispatchKey::of::<Chat>(),
            |_: &Chat| false,
            |_: &Chat| {},
            Duration::from_secs(1),
            again,
        )
        .unwrap();

    scheduler.advance(Duration::from_secs(1));
    assert_eq!(retries.count(), 1);
    assert_eq!(waiter.pending_total(), 1);
    assert_eq!(waiter.dispatch(&Chat::new("a", "b"), None), 1);
}

#[test]
fn shutdown_rejects_new_waits_but_keeps_pending_ones() {
    let (scheduler, waiter) = manual_waiter();
    let matched = Counter::new();
    let timed_out = Counter::new();
    let (m, t) = (matched.clone(), timed_out.clone());
    waiter
        .register(
            DispatchKey::of::<Chat>(),
            |c: &Chat| c.author == "a",
            move |_: &Chat| m.increment(),
        )
        .unwrap();
    waiter
        .register_with_timeout(
            DispatchKey::of::<BlockBreak>(),
            |_: &BlockBreak| false,
            |_: &BlockBreak| {},
            Duration::from_secs(1),
            move || t.increment(),
        )
        .unwrap();

    waiter.shutdown();
    waiter.shutdown();
    assert!(waiter.is_closed());
    // The waiter does not own a shared scheduler.
    assert!(!scheduler.is_shutdown());

    let err = waiter
        .register(DispatchKey::of::<Chat>(), |_: &Chat| true, |_: &Chat| {})
        .unwrap_err();
    assert!(matches!(err, WaitError::Closed));
    let err = waiter
        .wait_for::<Chat>()
        .when(|_: &Chat| true)
        .then(|_| {})
        .register()
        .unwrap_err();
    assert!(matches!(err, WaitError::Closed));

    assert_eq!(waiter.dispatch(&Chat::new("a", "still here"), None), 1);
    scheduler.advance(Duration::from_secs(1));
    assert_eq!((matched.count(), timed_out.count()), (1, 1));
}

#[test]
fn owned_scheduler_drains_after_shutdown() {
    let waiter = EventWaiter::builder()
        .thread_name("lifecycle-timer")
        .build()
        .unwrap();
    assert!(waiter.owns_scheduler());

    let (tx, rx) = mpsc::channel();
    let start = Instant::now();
    waiter
        .register_with_timeout(
            DispatchKey::of::<Chat>(),
            |_: &Chat| false,
            |_: &Chat| {},
            Duration::from_millis(50),
            move || {
                let _ = tx.send(Instant::now());
            },
        )
        .unwrap();

    waiter.shutdown();
    assert!(waiter.is_closed());

    let fired_at = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("timeout action never ran");
    assert!(fired_at.duration_since(start) >= Duration::from_millis(50));
}

#[test]
fn unbounded_timeout_on_owned_scheduler_is_accepted() {
    let waiter = EventWaiter::new();
    let timed_out = Counter::new();
    let t = timed_out.clone();
    let handle = waiter
        .register_with_timeout(
            DispatchKey::of::<Chat>(),
            |c: &Chat| c.text == "done",
            |_: &Chat| {},
            Duration::MAX,
            move || t.increment(),
        )
        .unwrap();
    assert_eq!(waiter.pending_total(), 1);
    assert!(!waiter.is_closed());

    // Still usable: further waits register and events match.
    waiter
        .register(DispatchKey::of::<Chat>(), |_: &Chat| true, |_: &Chat| {})
        .unwrap();
    assert_eq!(waiter.dispatch(&Chat::new("a", "later"), None), 1);

    assert!(handle.cancel());
    assert_eq!(waiter.pending_total(), 0);
    assert_eq!(timed_out.count(), 0);
}

#[test]
fn dropping_the_waiter_still_delivers_timeouts() {
    let (tx, rx) = mpsc::channel();
    {
        let waiter = EventWaiter::new();
        waiter
            .register_with_timeout(
                DispatchKey::of::<Chat>(),
                |_: &Chat| false,
                |_: &Chat| {},
                Duration::from_millis(20),
                move || {
                    let _ = tx.send(());
                },
            )
            .unwrap();
    }
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
}

#[test]
fn stats_track_every_outcome() {
    let (scheduler, waiter) = manual_waiter();
    waiter
        .register(DispatchKey::of::<Chat>(), |_: &Chat| true, |_: &Chat| {})
        .unwrap();
    waiter
        .register_with_timeout(
            DispatchKey::of::<BlockBreak>(),
            |_: &BlockBreak| false,
            |_: &BlockBreak| {},
            Duration::from_secs(1),
            || {},
        )
        .unwrap();
    let cancelled = waiter
        .register(
            DispatchKey::of::<BlockBreak>(),
            |_: &BlockBreak| false,
            |_: &BlockBreak| {},
        )
        .unwrap();
    waiter
        .register(
            DispatchKey::of::<Chat>(),
            |c: &Chat| c.author == "x",
            |_: &Chat| {},
        )
        .unwrap();

    waiter.dispatch(&Chat::new("a", "b"), None);
    scheduler.advance(Duration::from_secs(1));
    assert!(cancelled.cancel());

    let stats = waiter.stats();
    assert_eq!(stats.registered, 4);
    assert_eq!(stats.matched, 1);
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.pending(), 1);
    assert_eq!(waiter.pending_total(), 1);
}
