//! Server-Sent Events support

use crate::runtime::SseEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    init_event: SseEvent,
    broadcast_rx: tokio::sync::broadcast::Receiver<SseEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move { Ok(sse_event_to_axum(init_event)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(sse_event_to_axum(event))),
        Err(_) => None, // Skip lagged messages
    });

    let combined = init.chain(broadcasts);

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn sse_event_to_axum(event: SseEvent) -> Event {
    let (event_type, data) = event_payload(event);
    Event::default().event(event_type).data(data.to_string())
}

/// SSE event name and JSON body
fn event_payload(event: SseEvent) -> (String, Value) {
    match event {
        SseEvent::Init {
            state,
            input_enabled,
        } => (
            "init".to_string(),
            json!({
                "type": "init",
                "state": state,
                "input_enabled": input_enabled
            }),
        ),
        SseEvent::StateChange {
            state,
            input_enabled,
        } => (
            "state_change".to_string(),
            json!({
                "type": "state_change",
                "state": state,
                "input_enabled": input_enabled
            }),
        ),
        SseEvent::Notice { event_type, data } => (
            event_type.clone(),
            json!({
                "type": event_type,
                "data": data
            }),
        ),
        SseEvent::Error { message } => (
            "error".to_string(),
            json!({
                "type": "error",
                "message": message
            }),
        ),
    }
}
