//! Client-side dispatch: events carry the bus and the visitor, and
//! background work runs detached on the ambient tokio runtime.

use futures_util::future::BoxFuture;
use tokio::runtime::Handle;
use tracing::warn;

use edgebus_types::cookies::ReadonlyCookies;
use edgebus_types::event::EventRecord;
use edgebus_types::visitor::Visitor;

use super::DispatchAdapter;
use crate::bus::{BusOptions, MessageBus};
use crate::identity::visitor_from_cookies;
use crate::sink::DeliverySink;

/// Bus used by client code (browser runtime or CLI producer).
pub type ClientMessageBus = MessageBus<ClientDispatch>;

/// Event delivered to client listeners.
#[derive(Debug, Clone)]
pub struct ClientMessageEvent {
    bus: ClientMessageBus,
    visitor: Visitor,
    message: EventRecord,
}

impl ClientMessageEvent {
    /// The bus the event was emitted on. Listeners may emit follow-up events
    /// or change registrations through it.
    pub fn bus(&self) -> &ClientMessageBus {
        &self.bus
    }

    pub fn visitor(&self) -> &Visitor {
        &self.visitor
    }

    pub fn message(&self) -> &EventRecord {
        &self.message
    }
}

#[derive(Debug, Clone)]
pub struct ClientDispatch {
    visitor: Visitor,
}

impl ClientDispatch {
    pub fn new(visitor: Visitor) -> Self {
        Self { visitor }
    }

    /// Identify the visitor from the document's cookies.
    pub fn from_cookies(cookies: &ReadonlyCookies, session_cookie: &str) -> Self {
        Self::new(visitor_from_cookies(cookies, session_cookie))
    }

    pub fn visitor(&self) -> &Visitor {
        &self.visitor
    }
}

impl DispatchAdapter for ClientDispatch {
    type Event = ClientMessageEvent;

    fn wrap(&self, bus: &MessageBus<Self>, message: EventRecord) -> ClientMessageEvent {
        ClientMessageEvent {
            bus: bus.clone(),
            visitor: self.visitor.clone(),
            message,
        }
    }

    fn track(&self, work: BoxFuture<'static, ()>) {
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(work);
            }
            Err(_) => warn!("no tokio runtime available, background bus work dropped"),
        }
    }
}

impl MessageBus<ClientDispatch> {
    /// Create a client bus for `visitor` writing to `sink`.
    pub fn client(visitor: Visitor, sink: impl DeliverySink, options: BusOptions) -> Self {
        Self::new(ClientDispatch::new(visitor), sink, options)
    }

    pub fn visitor(&self) -> &Visitor {
        self.adapter().visitor()
    }
}
