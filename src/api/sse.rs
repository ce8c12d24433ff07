//! Server-Sent Events mirror of the display surface

use crate::transcript::{RenderedMessage, SurfaceEvent};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Snapshot a new subscriber starts from
pub struct InitSnapshot {
    pub session_id: String,
    pub messages: Vec<RenderedMessage>,
    pub send_enabled: bool,
}

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    init: InitSnapshot,
    broadcast_rx: broadcast::Receiver<SurfaceEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(event_stream(init, broadcast_rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// Init snapshot, then live events until the subscriber falls behind
///
/// A lagged subscriber has missed events it cannot recover, so the stream
/// ends there. EventSource reconnects on its own and starts again from a
/// fresh init snapshot.
fn event_stream(
    init: InitSnapshot,
    broadcast_rx: broadcast::Receiver<SurfaceEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let init = futures::stream::once(async move { Ok(init_event(init)) });

    let broadcasts = BroadcastStream::new(broadcast_rx)
        .map_while(|result| match result {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(error = %e, "SSE subscriber lagged, closing stream");
                None
            }
        })
        .map(|event| Ok(surface_event_to_axum(event)));

    init.chain(broadcasts)
}

fn init_event(init: InitSnapshot) -> Event {
    let data = json!({
        "type": "init",
        "session_id": init.session_id,
        "messages": init.messages,
        "send_enabled": init.send_enabled,
    });
    Event::default().event("init").data(data.to_string())
}

fn surface_event_to_axum(event: SurfaceEvent) -> Event {
    let (event_type, data) = match event {
        SurfaceEvent::Append { message } => (
            "append",
            json!({
                "type": "append",
                "message": message,
                "scroll": true
            }),
        ),
        SurfaceEvent::Remove { id } => (
            "remove",
            json!({
                "type": "remove",
                "id": id
            }),
        ),
        SurfaceEvent::SendControl { enabled } => (
            "send_control",
            json!({
                "type": "send_control",
                "enabled": enabled
            }),
        ),
        SurfaceEvent::Cleared => (
            "cleared",
            json!({
                "type": "cleared"
            }),
        ),
    };

    Event::default().event(event_type).data(data.to_string())
}
