//! Dispatch keys and waiter identifiers.
//!
//! A [`DispatchKey`] names the class of events a waiter is interested in: the
//! payload type ([`EventKind`]) and, for hosts whose event bus fires each
//! occurrence in several phases, the [`Priority`] tier it was fired under.

use crate::message::Message;
use std::{
    any::{TypeId, type_name},
    fmt,
    hash::{Hash, Hasher},
};

/// Identity of an event payload type.
///
/// Two kinds are equal when they describe the same Rust type. The type name
/// is carried for diagnostics only.
#[derive(Clone, Copy)]
pub struct EventKind {
    id: TypeId,
    name: &'static str,
}

impl EventKind {
    /// The kind of events of type `E`.
    pub fn of<E: Message>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: type_name::<E>(),
        }
    }

    /// The underlying type id.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// The type name, as reported by [`std::any::type_name`].
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this kind describes events of type `E`.
    pub fn is<E: Message>(&self) -> bool {
        self.id == TypeId::of::<E>()
    }
}

impl PartialEq for EventKind {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventKind {}

impl Hash for EventKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventKind").field(&self.name).finish()
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Phase tier a host fires an event occurrence under.
///
/// Variants are declared in the order a host fires them, so the derived
/// `Ord` matches firing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    /// Fired first.
    Lowest,
    /// Fired second.
    Low,
    /// The default tier.
    Normal,
    /// Fired fourth.
    High,
    /// Last tier allowed to react to the event.
    Highest,
    /// Observation-only tier, fired last.
    Monitor,
}

impl Priority {
    /// Every tier in firing order.
    pub const ALL: [Priority; 6] = [
        Priority::Lowest,
        Priority::Low,
        Priority::Normal,
        Priority::High,
        Priority::Highest,
        Priority::Monitor,
    ];

    /// Lowercase name of the tier.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Priority::Lowest => "lowest",
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Highest => "highest",
            Priority::Monitor => "monitor",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies which waiters an event occurrence is offered to.
///
/// Keys compare by value. A key without a priority is distinct from every
/// key with one: hosts that fire in tiers must dispatch under the tier they
/// are in, and waiters registered without a tier only see tier-less
/// dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchKey {
    kind: EventKind,
    priority: Option<Priority>,
}

impl DispatchKey {
    /// Create a key from its parts.
    pub const fn new(kind: EventKind, priority: Option<Priority>) -> Self {
        Self { kind, priority }
    }

    /// Tier-less key for events of type `E`.
    pub fn of<E: Message>() -> Self {
        Self::new(EventKind::of::<E>(), None)
    }

    /// Key for events of type `E` fired under `priority`.
    pub fn at<E: Message>(priority: Priority) -> Self {
        Self::new(EventKind::of::<E>(), Some(priority))
    }

    /// Same event kind, different tier.
    pub const fn with_priority(self, priority: Option<Priority>) -> Self {
        Self::new(self.kind, priority)
    }

    /// The event kind half of the key.
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// The tier half of the key.
    pub const fn priority(&self) -> Option<Priority> {
        self.priority
    }
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.priority {
            Some(priority) => write!(f, "{}@{}", self.kind, priority),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Process-unique identifier of one registered wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaitId(u64);

impl WaitId {
    /// Wrap a raw id.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WaitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
