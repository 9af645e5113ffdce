//! DeliverySink trait definition.
//!
//! A sink receives each flushed batch exactly once. It returns a boxed
//! `'static` future (rather than using RPITIT) so the bus can hold sinks as
//! `Arc<dyn DeliverySink>` and hand the pending write to its dispatch
//! adapter's tracker.

use futures_util::future::BoxFuture;

use edgebus_types::error::DeliveryError;
use edgebus_types::event::EventRecord;

/// Destination for flushed batches (beacon endpoint, warehouse, database).
///
/// Implementations live in edgebus-infra (e.g., `BeaconSink`).
///
/// `deliver` is called synchronously from `flush_to_external` with a
/// non-empty batch, in emission order. Work that must begin before the
/// caller continues (such as handing a beacon to the transport) belongs in
/// the body of `deliver`; the returned future completes the write. Errors are
/// logged by the bus and the batch is dropped.
pub trait DeliverySink: Send + Sync + 'static {
    /// Short name used in log fields (e.g., "beacon", "sqlite").
    fn name(&self) -> &str;

    /// Write one batch to the external destination.
    fn deliver(&self, batch: Vec<EventRecord>) -> BoxFuture<'static, Result<(), DeliveryError>>;
}
