//! Beacon ingest handler.
//!
//! Each request gets its own [`EdgeMessageBus`]: the visitor and cookies come
//! from the request, the sink is shared by the whole process. The batch is
//! re-emitted in order so edge listeners run, then flushed, and the response
//! is only sent once every tracked task has completed.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use tracing::info;

use edgebus_core::{EdgeMessageBus, EdgeMessageEvent, Listener};
use edgebus_types::cookies::ReadonlyCookies;
use edgebus_types::event::EventRecord;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Response payload for an accepted beacon.
#[derive(Debug, Serialize)]
pub struct IngestSummary {
    pub accepted: usize,
    pub visitor_id: String,
}

/// Join every `Cookie` header of the request into one cookie store.
fn request_cookies(headers: &HeaderMap) -> ReadonlyCookies {
    let joined = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");
    ReadonlyCookies::parse(&joined)
}

/// Register the listeners the edge runs for every request.
fn register_edge_listeners(bus: &EdgeMessageBus, log_event_types: &[String]) {
    for event_type in log_event_types {
        bus.on(
            event_type.clone(),
            Listener::new(|event: &EdgeMessageEvent| {
                info!(
                    event_type = event.message().event_type(),
                    visitor = %event.visitor().id,
                    data = %event.message().data(),
                    "edge event"
                );
                Ok(())
            }),
        );
    }
}

/// POST {ingest_path} - Accept a beacon batch.
///
/// The body is parsed from raw bytes because `navigator.sendBeacon` with a
/// string body is sent as `text/plain`.
pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<IngestSummary>>), AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let batch: Vec<EventRecord> = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("invalid event batch: {e}")))?;

    let bus = EdgeMessageBus::for_request(
        request_cookies(&headers),
        &state.config.edge.session_cookie,
        state.sink.clone(),
        state.bus_options(),
    );
    register_edge_listeners(&bus, &state.config.edge.log_event_types);

    let accepted = batch.len();
    for record in batch {
        let (event_type, data) = record.into_parts();
        bus.emit(event_type, data);
    }
    bus.finish().await;

    let visitor_id = bus.adapter().visitor().id.clone();
    let elapsed = start.elapsed().as_millis() as u64;
    info!(accepted, visitor = %visitor_id, elapsed_ms = elapsed, "beacon ingested");

    let resp = ApiResponse::success(
        IngestSummary {
            accepted,
            visitor_id,
        },
        request_id,
        elapsed,
    )
    .with_link("self", &state.config.edge.ingest_path);

    Ok((StatusCode::ACCEPTED, Json(resp)))
}
