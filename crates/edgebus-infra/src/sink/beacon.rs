//! BeaconSink: client-side delivery to the edge ingest endpoint.
//!
//! Mirrors a browser beacon. The request is handed to the transport as soon
//! as `deliver` is called and keeps going whether or not anyone awaits the
//! returned future. Outstanding beacons are tracked so a process about to
//! exit can [`drain`](BeaconSink::drain) them.

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::header::CONTENT_TYPE;
use tokio_util::task::TaskTracker;
use tracing::debug;

use edgebus_core::DeliverySink;
use edgebus_types::config::ClientConfig;
use edgebus_types::error::DeliveryError;
use edgebus_types::event::EventRecord;

/// Upper bound for a single beacon request.
const BEACON_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct BeaconSink {
    client: reqwest::Client,
    url: String,
    in_flight: TaskTracker,
}

impl BeaconSink {
    pub fn new(url: impl Into<String>) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(BEACON_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeliveryError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            in_flight: TaskTracker::new(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, DeliveryError> {
        Self::new(config.beacon_url.clone())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of beacons still being sent.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Wait up to `timeout` for outstanding beacons.
    ///
    /// Returns `true` when every beacon finished in time. Beacons sent after
    /// draining starts are still tracked.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.in_flight.close();
        let drained = tokio::time::timeout(timeout, self.in_flight.wait())
            .await
            .is_ok();
        self.in_flight.reopen();
        drained
    }
}

impl DeliverySink for BeaconSink {
    fn name(&self) -> &str {
        "beacon"
    }

    fn deliver(&self, batch: Vec<EventRecord>) -> BoxFuture<'static, Result<(), DeliveryError>> {
        let body = match serde_json::to_vec(&batch) {
            Ok(body) => body,
            Err(e) => return futures_util::future::ready(Err(e.into())).boxed(),
        };

        // Beacons are sent on a background task; without a runtime there is
        // nothing to send them on.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return futures_util::future::ready(Err(DeliveryError::Transport(
                "no tokio runtime to send beacon on".to_string(),
            )))
            .boxed();
        };

        let count = batch.len();
        let request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        let sending = self.in_flight.spawn_on(
            async move {
                let response = request
                    .send()
                    .await
                    .map_err(|e| DeliveryError::Transport(format!("beacon request failed: {e}")))?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(DeliveryError::Rejected {
                        status: status.as_u16(),
                        body,
                    });
                }

                debug!(count, %status, "beacon accepted");
                Ok(())
            },
            &handle,
        );

        async move {
            sending
                .await
                .map_err(|e| DeliveryError::Transport(format!("beacon task failed: {e}")))?
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use serde_json::json;

    use super::*;

    type Received = Arc<Mutex<Vec<(Option<String>, Vec<EventRecord>)>>>;

    /// Start a local endpoint that records each POSTed batch and answers
    /// with `status`.
    async fn spawn_receiver(status: StatusCode) -> (String, Received) {
        let received: Received = Arc::default();
        let store = Arc::clone(&received);
        let app = Router::new().route(
            "/ingest",
            post(move |headers: HeaderMap, body: String| {
                let store = Arc::clone(&store);
                async move {
                    let content_type = headers
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    let batch: Vec<EventRecord> = serde_json::from_str(&body).unwrap();
                    store.lock().unwrap().push((content_type, batch));
                    status
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/ingest"), received)
    }

    #[tokio::test]
    async fn posts_batch_as_json_array() {
        let (url, received) = spawn_receiver(StatusCode::ACCEPTED).await;
        let sink = BeaconSink::new(url).unwrap();
        let batch = vec![
            EventRecord::new("Example.FIRST", json!({"first": 1})),
            EventRecord::new("Example.SECOND", json!({"second": 2})),
        ];

        sink.deliver(batch.clone()).await.unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0.as_deref(), Some("application/json"));
        assert_eq!(received[0].1, batch);
    }

    #[tokio::test]
    async fn beacon_is_sent_without_awaiting_deliver() {
        let (url, received) = spawn_receiver(StatusCode::ACCEPTED).await;
        let sink = BeaconSink::new(url).unwrap();

        drop(sink.deliver(vec![EventRecord::new("A", json!({}))]));
        assert!(sink.drain(Duration::from_secs(5)).await);

        assert_eq!(received.lock().unwrap().len(), 1);
        assert_eq!(sink.in_flight(), 0);
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let (url, _received) = spawn_receiver(StatusCode::SERVICE_UNAVAILABLE).await;
        let sink = BeaconSink::new(url).unwrap();

        let err = sink
            .deliver(vec![EventRecord::new("A", json!({}))])
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Rejected { status: 503, .. }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = BeaconSink::new(format!("http://{addr}/ingest")).unwrap();
        let err = sink
            .deliver(vec![EventRecord::new("A", json!({}))])
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
    }

    #[test]
    fn deliver_without_runtime_fails_instead_of_panicking() {
        let sink = BeaconSink::new("http://127.0.0.1:9/ingest").unwrap();

        let result = sink
            .deliver(vec![EventRecord::new("A", json!({}))])
            .now_or_never()
            .expect("ready without a runtime");
        assert!(matches!(result, Err(DeliveryError::Transport(_))));
        assert_eq!(sink.in_flight(), 0);
    }

    #[test]
    fn client_bus_flush_without_runtime_drops_batch() {
        use edgebus_core::{BusOptions, ClientMessageBus};
        use edgebus_types::visitor::Visitor;

        let sink = BeaconSink::new("http://127.0.0.1:9/ingest").unwrap();
        let bus = ClientMessageBus::client(Visitor::new("v-1"), sink, BusOptions::default());

        bus.emit("A", json!({})).flush_to_external();

        assert_eq!(bus.pending_len(), 0);
        assert!(!bus.is_timer_armed());
    }

    #[tokio::test]
    async fn drain_with_nothing_in_flight_is_immediate() {
        let sink = BeaconSink::from_config(&ClientConfig::default()).unwrap();
        assert!(sink.drain(Duration::from_millis(10)).await);
        assert_eq!(sink.url(), "http://127.0.0.1:8787/.edgebus/message-bus");
    }
}
