//! Sink that only logs batches. The edge default when no durable store is
//! configured.

use futures_util::future::{self, BoxFuture, FutureExt};
use tracing::{debug, info};

use edgebus_core::DeliverySink;
use edgebus_types::error::DeliveryError;
use edgebus_types::event::EventRecord;

#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl DeliverySink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver(&self, batch: Vec<EventRecord>) -> BoxFuture<'static, Result<(), DeliveryError>> {
        let event_types: Vec<&str> = batch.iter().map(EventRecord::event_type).collect();
        info!(count = batch.len(), ?event_types, "batch delivered");
        for record in &batch {
            debug!(event_type = record.event_type(), data = %record.data(), "delivered event");
        }
        future::ready(Ok(())).boxed()
    }
}
