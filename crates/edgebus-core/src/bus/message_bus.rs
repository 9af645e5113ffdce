use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use edgebus_types::event::{EventRecord, KnownMessage};

use super::listener::{Callback, Listener};
use super::BusOptions;
use crate::dispatch::DispatchAdapter;
use crate::sink::DeliverySink;

/// The throttle timer currently armed for the pending batch.
struct ArmedTimer {
    generation: u64,
    cancel: CancellationToken,
}

/// Records awaiting delivery plus the timer that will flush them.
///
/// Invariant: `timer.is_some()` exactly when `records` is non-empty.
#[derive(Default)]
struct PendingBatch {
    records: Vec<EventRecord>,
    timer: Option<ArmedTimer>,
    generation: u64,
}

struct BusInner<A: DispatchAdapter> {
    options: BusOptions,
    listeners: DashMap<String, Vec<Listener<A::Event>>>,
    pending: Mutex<PendingBatch>,
    sink: Arc<dyn DeliverySink>,
    adapter: A,
}

/// Event bus with synchronous listener dispatch and throttled, batched
/// delivery to an external sink.
///
/// Cloning the bus clones a handle to the same instance. Must be used from
/// within a tokio runtime so the throttle timer can be scheduled.
///
/// Per-batch state machine:
///
/// ```text
/// EMPTY --emit--> PENDING (timer armed) --timer | flush--> DELIVERING --> EMPTY
/// ```
pub struct MessageBus<A: DispatchAdapter> {
    inner: Arc<BusInner<A>>,
}

impl<A: DispatchAdapter> Clone for MessageBus<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: DispatchAdapter> MessageBus<A> {
    /// Create a bus that owns its sink.
    pub fn new(adapter: A, sink: impl DeliverySink, options: BusOptions) -> Self {
        Self::with_shared_sink(adapter, Arc::new(sink), options)
    }

    /// Create a bus writing to a sink shared with other bus instances
    /// (e.g., one warehouse client for every edge request).
    pub fn with_shared_sink(adapter: A, sink: Arc<dyn DeliverySink>, options: BusOptions) -> Self {
        Self {
            inner: Arc::new(BusInner {
                options,
                listeners: DashMap::new(),
                pending: Mutex::new(PendingBatch::default()),
                sink,
                adapter,
            }),
        }
    }

    /// Register `listener` for `event_type`.
    ///
    /// Registering the same handle (or a clone of it) twice is a no-op, so a
    /// listener fires at most once per matching emit.
    pub fn on(&self, event_type: impl Into<String>, listener: Listener<A::Event>) -> &Self {
        self.register(event_type.into(), listener);
        self
    }

    /// Remove a previously registered listener, both its `on` and its `once`
    /// registration. Unknown listeners and event types are ignored.
    pub fn off(&self, event_type: &str, listener: &Listener<A::Event>) -> &Self {
        let id = listener.id();
        self.remove_where(event_type, |l| l.id() == id);
        self
    }

    /// Register `listener` for the next matching emit only.
    ///
    /// The registration is removed before the callback runs, so a callback
    /// that emits the same type again is not re-invoked. It is independent of
    /// an `on` registration of the same handle.
    pub fn once(&self, event_type: impl Into<String>, listener: Listener<A::Event>) -> &Self {
        self.register(event_type.into(), listener.into_once());
        self
    }

    /// Emit an event: append it to the pending batch, arm the throttle timer
    /// if needed, then synchronously notify every listener registered for
    /// `event_type` at the time of the call.
    pub fn emit(&self, event_type: impl Into<String>, data: serde_json::Value) -> &Self {
        let record = EventRecord::new(event_type, data);
        if self.inner.options.debug {
            debug!(event_type = record.event_type(), data = %record.data(), "bus emit");
        }

        self.enqueue(record.clone());
        self.dispatch(&record);
        self
    }

    /// Emit a typed message under its well-known event type.
    ///
    /// A payload that fails to serialize is logged and dropped.
    pub fn emit_message<M: KnownMessage>(&self, message: &M) -> &Self {
        match serde_json::to_value(message) {
            Ok(data) => self.emit(M::TYPE, data),
            Err(e) => {
                warn!(event_type = M::TYPE, error = %e, "failed to serialize message, dropped");
                self
            }
        }
    }

    /// Hand the pending batch to the sink immediately and cancel the throttle
    /// timer. A no-op when nothing is pending.
    pub fn flush_to_external(&self) -> &Self {
        if let Some(batch) = self.take_batch(None) {
            self.deliver(batch);
        }
        self
    }

    /// Number of records waiting for the next flush.
    pub fn pending_len(&self) -> usize {
        self.lock_pending().records.len()
    }

    /// Whether a throttle timer is armed for the pending batch.
    pub fn is_timer_armed(&self) -> bool {
        self.lock_pending().timer.is_some()
    }

    /// Number of listeners registered for `event_type`.
    pub fn listener_count(&self, event_type: &str) -> usize {
        self.inner
            .listeners
            .get(event_type)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }

    pub fn throttle_delay(&self) -> Duration {
        self.inner.options.throttle_delay
    }

    /// The environment adapter this bus dispatches through.
    pub fn adapter(&self) -> &A {
        &self.inner.adapter
    }

    // -- registry -----------------------------------------------------------

    fn register(&self, event_type: String, listener: Listener<A::Event>) {
        let mut entry = self.inner.listeners.entry(event_type).or_default();
        if entry
            .iter()
            .any(|l| l.id() == listener.id() && l.once == listener.once)
        {
            return;
        }
        entry.push(listener);
    }

    /// Returns true when at least one matching registration was removed.
    fn remove_where<F>(&self, event_type: &str, matches: F) -> bool
    where
        F: Fn(&Listener<A::Event>) -> bool,
    {
        let removed = match self.inner.listeners.get_mut(event_type) {
            Some(mut entry) => {
                let before = entry.len();
                entry.retain(|l| !matches(l));
                entry.len() != before
            }
            None => false,
        };
        if removed {
            self.inner
                .listeners
                .remove_if(event_type, |_, listeners| listeners.is_empty());
        }
        removed
    }

    // -- dispatch -----------------------------------------------------------

    fn dispatch(&self, record: &EventRecord) {
        // Snapshot so listeners may call on/off/emit without disturbing
        // this iteration.
        let snapshot: Vec<Listener<A::Event>> = match self.inner.listeners.get(record.event_type()) {
            Some(entry) => entry.value().clone(),
            None => return,
        };

        for listener in &snapshot {
            // A once-listener already consumed by a reentrant emit is skipped.
            if listener.once {
                let id = listener.id();
                if !self.remove_where(record.event_type(), |l| l.once && l.id() == id) {
                    continue;
                }
            }
            self.notify(listener, record);
        }
    }

    fn notify(&self, listener: &Listener<A::Event>, record: &EventRecord) {
        let event = self.inner.adapter.wrap(self, record.clone());
        let event_type = record.event_type();

        match &listener.callback {
            Callback::Sync(callback) => {
                match std::panic::catch_unwind(AssertUnwindSafe(|| callback(&event))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(event_type, listener = %listener.id(), error = %e, "listener failed");
                    }
                    Err(_) => {
                        warn!(event_type, listener = %listener.id(), "listener panicked");
                    }
                }
            }
            Callback::Async(callback) => {
                let work = match std::panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                    Ok(work) => work,
                    Err(_) => {
                        warn!(event_type, listener = %listener.id(), "listener panicked");
                        return;
                    }
                };
                let event_type = event_type.to_string();
                let id = listener.id();
                self.inner.adapter.track(Box::pin(async move {
                    match AssertUnwindSafe(work).catch_unwind().await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            warn!(event_type = %event_type, listener = %id, error = %e, "listener failed");
                        }
                        Err(_) => {
                            warn!(event_type = %event_type, listener = %id, "listener panicked");
                        }
                    }
                }));
            }
        }
    }

    // -- batching -----------------------------------------------------------

    fn enqueue(&self, record: EventRecord) {
        let armed = {
            let mut pending = self.lock_pending();
            pending.records.push(record);
            if pending.timer.is_some() {
                None
            } else {
                pending.generation += 1;
                let timer = ArmedTimer {
                    generation: pending.generation,
                    cancel: CancellationToken::new(),
                };
                let armed = (timer.generation, timer.cancel.clone());
                pending.timer = Some(timer);
                Some(armed)
            }
        };

        if let Some((generation, cancel)) = armed {
            self.schedule_flush(generation, cancel);
        }
    }

    fn schedule_flush(&self, generation: u64, cancel: CancellationToken) {
        let bus = self.clone();
        let delay = self.inner.options.throttle_delay;
        self.inner.adapter.track(Box::pin(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Some(batch) = bus.take_batch(Some(generation)) {
                        bus.deliver(batch);
                    }
                }
            }
        }));
    }

    /// Atomically take the pending batch and disarm its timer.
    ///
    /// With `generation` set (timer path), only the batch that timer was
    /// armed for is taken; a timer that lost a race with an explicit flush
    /// finds a newer generation and does nothing.
    fn take_batch(&self, generation: Option<u64>) -> Option<Vec<EventRecord>> {
        let mut pending = self.lock_pending();
        if let Some(generation) = generation {
            let current = pending.timer.as_ref().map(|t| t.generation);
            if current != Some(generation) {
                return None;
            }
        }
        if pending.records.is_empty() {
            return None;
        }
        if let Some(timer) = pending.timer.take() {
            timer.cancel.cancel();
        }
        Some(std::mem::take(&mut pending.records))
    }

    fn deliver(&self, batch: Vec<EventRecord>) {
        let sink_name = self.inner.sink.name().to_string();
        let count = batch.len();
        if self.inner.options.debug {
            debug!(sink = %sink_name, count, "bus flush");
        }

        let write = self.inner.sink.deliver(batch);
        self.inner.adapter.track(Box::pin(async move {
            if let Err(e) = write.await {
                warn!(sink = %sink_name, count, error = %e, "batch delivery failed, dropped");
            }
        }));
    }

    fn lock_pending(&self) -> MutexGuard<'_, PendingBatch> {
        // Listeners never run under this lock, so poisoning can only come from
        // a panic inside the bus itself; the batch is still consistent.
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: DispatchAdapter> std::fmt::Debug for MessageBus<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("sink", &self.inner.sink.name())
            .field("event_types", &self.inner.listeners.len())
            .field("throttle_delay", &self.inner.options.throttle_delay)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
