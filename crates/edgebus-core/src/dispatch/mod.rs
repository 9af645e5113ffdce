//! Dispatch adapters: the environment-specific half of a bus.
//!
//! The bus core is the same in the browser-side client and at the edge. What
//! differs is the shape of the event handed to listeners and what happens to
//! work that outlives `emit` (async listeners, pending deliveries, the
//! throttle timer). A [`DispatchAdapter`] supplies both.

pub mod client;
pub mod edge;

use futures_util::future::BoxFuture;

use edgebus_types::event::EventRecord;

use crate::bus::MessageBus;

/// Environment hook for a [`MessageBus`].
///
/// Uses `Sized` so the bus can be generic over the adapter without dynamic
/// dispatch on the hot path.
pub trait DispatchAdapter: Send + Sync + Sized + 'static {
    /// Event passed to listeners of a bus using this adapter.
    type Event: Send + Sync + 'static;

    /// Wrap a record into the event given to one listener invocation.
    fn wrap(&self, bus: &MessageBus<Self>, message: EventRecord) -> Self::Event;

    /// Take ownership of background work started by the bus.
    ///
    /// The client lets it run detached. The edge tracks it so the request is
    /// not finalized before the work completes.
    fn track(&self, work: BoxFuture<'static, ()>);
}
