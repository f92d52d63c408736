//! Priority tiers as part of the dispatch key.

mod common;

use common::{BlockBreak, manual_waiter};
use tarry::{DispatchKey, Priority, WaitError, testing::CallLog};

fn dirt() -> BlockBreak {
    BlockBreak {
        player: 3,
        block: "dirt",
    }
}

#[test]
fn all_priorities_fire_in_tier_order() {
    let (_, waiter) = manual_waiter();
    let order = CallLog::new();

    // Registered in scrambled order on purpose.
    let tiers = [
        Some(Priority::Monitor),
        None,
        Some(Priority::Low),
        Some(Priority::Highest),
        Some(Priority::Lowest),
        Some(Priority::Normal),
        Some(Priority::High),
    ];
    for priority in tiers {
        let order = order.clone();
        let key = DispatchKey::of::<BlockBreak>().with_priority(priority);
        waiter
            .register(key, |_: &BlockBreak| true, move |_: &BlockBreak| {
                order.push(priority.map_or("untiered", |p| p.as_str()))
            })
            .unwrap();
    }
    assert_eq!(waiter.keys().len(), 7);

    assert_eq!(waiter.dispatch_all_priorities(&dirt()), 7);
    assert_eq!(
        order.entries(),
        vec!["untiered", "lowest", "low", "normal", "high", "highest", "monitor"]
    );
    assert_eq!(waiter.dispatch_all_priorities(&dirt()), 0);
}

#[test]
fn dispatch_key_checks_the_event_type() {
    let (_, waiter) = manual_waiter();
    let key = DispatchKey::at::<BlockBreak>(Priority::High);
    waiter
        .register(key, |e: &BlockBreak| e.player == 3, |_: &BlockBreak| {})
        .unwrap();

    assert_eq!(waiter.dispatch_key(&key, &dirt()).unwrap(), 1);

    let err = waiter.dispatch_key(&key, &"not a block").unwrap_err();
    assert!(matches!(err, WaitError::InvalidArgument(_)));
    assert!(err.to_string().contains("BlockBreak"));
}

#[test]
fn keys_display_type_and_tier() {
    let key = DispatchKey::at::<BlockBreak>(Priority::Monitor);
    let shown = key.to_string();
    assert!(shown.ends_with("BlockBreak@monitor"), "{shown}");
    assert_eq!(key.priority(), Some(Priority::Monitor));
    assert!(key.kind().is::<BlockBreak>());
}
