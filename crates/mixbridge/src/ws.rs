//! WebSocket handler for client connections.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bridge::Bridge;

/// WebSocket upgrade handler.
///
/// GET /ws
pub async fn ws_handler(State(bridge): State<Arc<Bridge>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, bridge))
}

/// Handle a WebSocket connection.
async fn handle_ws_connection(socket: WebSocket, bridge: Arc<Bridge>) {
    let (mut sender, mut receiver) = socket.split();
    let (id, mut events) = bridge.sessions.connect();

    // Spawn task to send events to client
    let send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let json = match event.to_json() {
                Ok(j) => j,
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    loop {
        tokio::select! {
            _ = bridge.shutdown.cancelled() => break,
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => bridge.sessions.handle_text(id, text.as_str()),
                Some(Ok(Message::Binary(_))) => {
                    debug!(session = %id, "ignoring binary frame");
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    info!(session = %id, "client closed WebSocket");
                    break;
                }
                Some(Err(e)) => {
                    warn!(session = %id, "WebSocket error: {}", e);
                    break;
                }
            }
        }
    }

    bridge.sessions.disconnect(id);
    send_task.abort();
}
