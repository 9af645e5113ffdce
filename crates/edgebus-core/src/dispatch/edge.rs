//! Edge-side dispatch: events also carry the request cookies, and every
//! piece of background work is tracked so the request handler can wait for
//! it before finalizing.
//!
//! One [`EdgeMessageBus`] is created per incoming request. The handler
//! flushes the bus once it has re-emitted the request's events, then closes
//! and waits on the tracker returned by [`EdgeDispatch::tracker`].

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio_util::task::TaskTracker;

use edgebus_types::cookies::ReadonlyCookies;
use edgebus_types::event::EventRecord;
use edgebus_types::visitor::Visitor;

use super::DispatchAdapter;
use crate::bus::{BusOptions, MessageBus};
use crate::identity::visitor_from_cookies;
use crate::sink::DeliverySink;

/// Bus used inside the edge request handler.
pub type EdgeMessageBus = MessageBus<EdgeDispatch>;

/// Event delivered to edge listeners.
#[derive(Debug, Clone)]
pub struct EdgeMessageEvent {
    bus: EdgeMessageBus,
    visitor: Visitor,
    message: EventRecord,
    cookies: Arc<ReadonlyCookies>,
}

impl EdgeMessageEvent {
    pub fn bus(&self) -> &EdgeMessageBus {
        &self.bus
    }

    pub fn visitor(&self) -> &Visitor {
        &self.visitor
    }

    pub fn message(&self) -> &EventRecord {
        &self.message
    }

    /// Cookies of the request that carried this event. Read-only.
    pub fn cookies(&self) -> &ReadonlyCookies {
        &self.cookies
    }
}

#[derive(Debug, Clone)]
pub struct EdgeDispatch {
    visitor: Visitor,
    cookies: Arc<ReadonlyCookies>,
    tracker: TaskTracker,
}

impl EdgeDispatch {
    pub fn new(visitor: Visitor, cookies: ReadonlyCookies) -> Self {
        Self {
            visitor,
            cookies: Arc::new(cookies),
            tracker: TaskTracker::new(),
        }
    }

    /// Build the adapter for a request, resolving the visitor from its
    /// session cookie.
    pub fn for_request(cookies: ReadonlyCookies, session_cookie: &str) -> Self {
        let visitor = visitor_from_cookies(&cookies, session_cookie);
        Self::new(visitor, cookies)
    }

    pub fn visitor(&self) -> &Visitor {
        &self.visitor
    }

    pub fn cookies(&self) -> &ReadonlyCookies {
        &self.cookies
    }

    /// Tracker holding every async listener, timer, and delivery started by
    /// this request's bus.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }
}

impl DispatchAdapter for EdgeDispatch {
    type Event = EdgeMessageEvent;

    fn wrap(&self, bus: &MessageBus<Self>, message: EventRecord) -> EdgeMessageEvent {
        EdgeMessageEvent {
            bus: bus.clone(),
            visitor: self.visitor.clone(),
            message,
            cookies: Arc::clone(&self.cookies),
        }
    }

    fn track(&self, work: BoxFuture<'static, ()>) {
        self.tracker.spawn(work);
    }
}

impl MessageBus<EdgeDispatch> {
    /// Create the bus for one edge request, sharing the process-wide sink.
    pub fn for_request(
        cookies: ReadonlyCookies,
        session_cookie: &str,
        sink: Arc<dyn DeliverySink>,
        options: BusOptions,
    ) -> Self {
        Self::with_shared_sink(EdgeDispatch::for_request(cookies, session_cookie), sink, options)
    }

    /// Flush anything pending, then wait until every tracked task (async
    /// listeners and deliveries) has finished.
    pub async fn finish(&self) {
        self.flush_to_external();
        let tracker = self.adapter().tracker();
        tracker.close();
        tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use edgebus_types::error::DeliveryError;
    use serde_json::json;

    use super::*;
    use crate::bus::Listener;

    /// Sink whose write completes only after a delay.
    #[derive(Clone, Default)]
    struct SlowSink {
        written: Arc<Mutex<Vec<EventRecord>>>,
    }

    impl DeliverySink for SlowSink {
        fn name(&self) -> &str {
            "slow"
        }

        fn deliver(&self, batch: Vec<EventRecord>) -> BoxFuture<'static, Result<(), DeliveryError>> {
            let written = Arc::clone(&self.written);
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                written.lock().unwrap().extend(batch);
                Ok(())
            })
        }
    }

    fn make_bus(sink: &SlowSink, cookie_header: &str) -> EdgeMessageBus {
        EdgeMessageBus::for_request(
            ReadonlyCookies::parse(cookie_header),
            "Edgebus-Session",
            Arc::new(sink.clone()),
            BusOptions::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn listener_reads_request_cookies() {
        let sink = SlowSink::default();
        let bus = make_bus(&sink, "Edgebus-Session=visitor-7; theme=dark");
        let seen = Arc::new(Mutex::new(None));

        let seen_clone = Arc::clone(&seen);
        bus.on(
            "Example.VIEW",
            Listener::new(move |event: &EdgeMessageEvent| {
                *seen_clone.lock().unwrap() = Some((
                    event.visitor().id.clone(),
                    event.cookies().get("theme").map(str::to_string),
                    event.message().event_type().to_string(),
                ));
                Ok(())
            }),
        );
        bus.emit("Example.VIEW", json!({}));

        assert_eq!(
            *seen.lock().unwrap(),
            Some((
                "visitor-7".to_string(),
                Some("dark".to_string()),
                "Example.VIEW".to_string()
            ))
        );
        bus.finish().await;
    }

    #[tokio::test(start_paused = true)]
    async fn finish_waits_for_async_listeners_and_delivery() {
        let sink = SlowSink::default();
        let bus = make_bus(&sink, "Edgebus-Session=v");
        let done = Arc::new(AtomicUsize::new(0));

        let done_clone = Arc::clone(&done);
        bus.on(
            "Example.WRITE",
            Listener::new_async(move |_event: EdgeMessageEvent| {
                let done = Arc::clone(&done_clone);
                async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );

        bus.emit("Example.WRITE", json!({"n": 1}));
        bus.emit("Example.WRITE", json!({"n": 2}));
        bus.finish().await;

        assert_eq!(done.load(Ordering::SeqCst), 2);
        assert_eq!(sink.written.lock().unwrap().len(), 2);
        assert!(!bus.is_timer_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn finish_without_events_returns_immediately() {
        let sink = SlowSink::default();
        let bus = make_bus(&sink, "");
        bus.finish().await;
        assert!(sink.written.lock().unwrap().is_empty());
        assert!(bus.adapter().visitor().is_anonymous());
    }
}
