//! Message bus core for edgebus.
//!
//! This crate owns listener registration, synchronous dispatch, and the
//! throttle/flush state machine. Environment-specific behavior enters through
//! two seams: [`sink::DeliverySink`] performs the external write of a flushed
//! batch, and [`dispatch::DispatchAdapter`] wraps records into message events
//! and tracks background work. Implementations of the sink live in
//! `edgebus-infra`; both dispatch adapters live here because they need no I/O.

pub mod bus;
pub mod dispatch;
pub mod identity;
pub mod sink;

pub use bus::{BusOptions, Listener, ListenerId, MessageBus};
pub use dispatch::client::{ClientDispatch, ClientMessageBus, ClientMessageEvent};
pub use dispatch::edge::{EdgeDispatch, EdgeMessageBus, EdgeMessageEvent};
pub use dispatch::DispatchAdapter;
pub use sink::DeliverySink;
