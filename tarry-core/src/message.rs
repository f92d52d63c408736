//! Message trait for event types.

/// A marker trait for events that waiters can be registered against.
///
/// Messages must be `Send + Sync + 'static`: the payload type doubles as the
/// event-type half of a [`DispatchKey`], and dispatch hands it to waiters
/// as `&dyn Any`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct BlockBreak { x: i32, y: i32, z: i32 }
///
/// impl Message for BlockBreak {}
/// ```
///
/// [`DispatchKey`]: crate::DispatchKey
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Message",
    label = "must be `Send + Sync + 'static`",
    note = "Events waited on with Tarry must be thread-safe and static."
)]
pub trait Message: Send + Sync + 'static {}

// Common Message implementations
impl Message for () {}
impl Message for String {}
impl Message for &'static str {}
impl Message for u32 {}
impl Message for u64 {}
impl Message for i32 {}
impl Message for i64 {}
impl Message for usize {}
impl<T: Message> Message for Box<T> {}
impl<T: Message> Message for std::sync::Arc<T> {}
impl<T: Message> Message for Vec<T> {}
impl<T: Message> Message for Option<T> {}
impl<T: Message, E: Message> Message for Result<T, E> {}
