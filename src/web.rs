pub mod routes;

use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use warp::ws::{Message, WebSocket};

use crate::state::AppState;

pub const VIEWER_PAGE: &str = include_str!("web/viewer.html");

/// Lifecycle of one viewer: register, ask for the current render, forward
/// pushes until the socket closes, then unregister.
pub async fn handle_viewer_connection(ws: WebSocket, state: AppState) {
    let (mut tx, mut rx) = ws.split();
    let (client_id, mut outbox) = state.registry.register();
    tracing::info!(client = %client_id, viewers = state.registry.count(), "viewer connected");

    // Task to send outgoing renders to the WebSocket
    let writer = tokio::spawn(async move {
        while let Some(markup) = outbox.recv().await {
            if tx.send(Message::text(markup)).await.is_err() {
                // connection closed
                break;
            }
        }
        let _ = tx.close().await;
    });

    state.triggers.client_joined(client_id.clone());

    // Viewers never send anything meaningful; just wait for the close.
    while let Some(result) = rx.next().await {
        match result {
            Ok(msg) if msg.is_close() => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(client = %client_id, "websocket error: {}", e);
                break;
            }
        }
    }

    state.registry.unregister(&client_id);
    writer.abort();
    tracing::info!(client = %client_id, viewers = state.registry.count(), "viewer disconnected");
}
