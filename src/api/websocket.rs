//! WebSocket transport for the console event channel.
//!
//! One socket carries one console session. Client frames are JSON
//! [`ClientEvent`]s; server frames are JSON [`ServerEvent`]s fed through
//! an mpsc queue, so emission order is delivery order.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use super::handlers::AppState;
use crate::events::{ClientEvent, EventSink, ServerEvent};
use crate::session::SessionId;

/// Depth of the per-session outbound event queue.
const EVENT_QUEUE_DEPTH: usize = 256;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one console connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let id = SessionId::new();
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (sink, mut rx) = EventSink::channel(EVENT_QUEUE_DEPTH);

    // Forward queued server events onto the wire as JSON text frames.
    let forward = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    warn!(session = %id, error = %e, "event serialization failed");
                    continue;
                }
            };
            if ws_sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        // Flush a close frame if the client is still there.
        let _ = ws_sink.send(Message::Close(None)).await;
    });

    let mut started = false;

    while let Some(msg) = ws_stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) => continue, // axum answers pings itself
            Ok(_) => continue,
            Err(_) => break,
        };

        let event: ClientEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(e) => {
                debug!(session = %id, error = %e, "unparseable client frame");
                sink.emit(ServerEvent::TerminalOutput {
                    data: format!("! Unrecognized frame: {}\n", e),
                })
                .await;
                continue;
            }
        };

        match event {
            ClientEvent::TerminalStart { target } => {
                if started {
                    debug!(session = %id, "duplicate terminal_start ignored");
                    continue;
                }
                started = true;
                if let Err(e) = state.driver.connect(id, &target, &sink).await {
                    warn!(session = %id, %target, error = %e, "console connect failed");
                }
            }
            ClientEvent::TerminalInput { data } => {
                if !started {
                    sink.emit(ServerEvent::TerminalOutput {
                        data: "! Send terminal_start first\n".to_string(),
                    })
                    .await;
                    continue;
                }
                if let Err(e) = state.driver.input(id, data.text(), &sink).await {
                    debug!(session = %id, error = %e, "input handling failed");
                }
            }
        }
    }

    // Socket gone: tear the session down so late results are discarded.
    if started {
        if let Err(e) = state.driver.disconnect(id).await {
            debug!(session = %id, error = %e, "disconnect cleanup failed");
        }
    }

    drop(sink);
    let _ = forward.await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_frame_parse() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"terminal_start","target":"web1"}"#).unwrap();
        assert!(matches!(event, ClientEvent::TerminalStart { .. }));
    }

    #[test]
    fn test_garbage_frame_rejected() {
        let result = serde_json::from_str::<ClientEvent>(r#"{"event":"reboot_universe"}"#);
        assert!(result.is_err());
    }
}
