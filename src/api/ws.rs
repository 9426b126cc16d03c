//! WebSocket subscription feed.
//!
//! A new subscriber immediately receives one `snapshot` frame holding
//! the complete current state, then the live event stream in publish
//! order — never a partial window, never a duplicate event. A client
//! may send `{"request":"snapshot"}` at any time to get a fresh full
//! snapshot in-stream (pull-style refresh).

use crate::api::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Deserialize)]
struct ClientRequest {
    request: String,
}

/// Handles WebSocket upgrade requests for the subscription feed.
pub async fn handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before taking the snapshot: everything in flight after
    // this point arrives on the stream, everything before is in the
    // snapshot.
    let (snapshot, mut rx) = state.orchestrator.subscribe();

    let frame = json!({ "type": "snapshot", "data": snapshot });
    if sender.send(Message::Text(frame.to_string())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = %e, "failed to serialize event");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    // The subscriber fell behind the buffer; resync it
                    // with a fresh snapshot instead of a gapped stream.
                    tracing::warn!(missed, "subscriber lagged, resyncing");
                    if send_snapshot(&mut sender, &state).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(request) = serde_json::from_str::<ClientRequest>(&text) {
                        if request.request == "snapshot"
                            && send_snapshot(&mut sender, &state).await.is_err()
                        {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            }
        }
    }
}

async fn send_snapshot(
    sender: &mut SplitSink<WebSocket, Message>,
    state: &Arc<AppState>,
) -> Result<(), axum::Error> {
    let frame = json!({ "type": "snapshot", "data": state.orchestrator.snapshot() });
    sender.send(Message::Text(frame.to_string())).await
}
