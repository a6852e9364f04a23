//! WebSocket subscription endpoint
//!
//! One connection per run id; the server pushes a JSON text frame per event
//! and ignores inbound frames. Subscribers joining mid-run see only events
//! published after they joined.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use metrics::gauge;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, instrument};

use crate::state::AppState;

/// Current live WebSocket connections
pub const WS_CONNECTIONS_GAUGE: &str = "ws_connections_current";

#[instrument(skip(state, upgrade), fields(run_id = %run_id))]
pub async fn run_events_ws(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| handle_socket(state, run_id, socket))
}

async fn handle_socket(state: AppState, run_id: String, socket: WebSocket) {
    let mut events = state.bus.subscribe(&run_id);
    let (mut sink, mut inbound) = socket.split();
    gauge!(WS_CONNECTIONS_GAUGE).increment(1.0);
    debug!(run_id = %run_id, "WebSocket subscriber connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                // A lagged subscriber skips ahead rather than stalling the bus.
                Err(RecvError::Lagged(skipped)) => {
                    debug!(run_id = %run_id, skipped, "WebSocket subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
            frame = inbound.next() => match frame {
                // Inbound frames are ignored; only disconnects matter.
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
        }
    }

    gauge!(WS_CONNECTIONS_GAUGE).decrement(1.0);
    debug!(run_id = %run_id, "WebSocket subscriber disconnected");
}
