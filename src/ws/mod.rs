pub mod handlers;

mod chat;
mod join;
mod message;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use std::sync::Arc;

use crate::hub::Subscription;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serialize and send one server message
async fn send_json(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            Ok(())
        }
    }
}

/// Handle individual WebSocket connection.
///
/// Inbound events from this connection are handled one at a time, so a
/// client's own sends are applied in the order it sent them. Other
/// connections' events interleave freely at store awaits.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let Subscription {
        id: conn_id,
        mut queue,
    } = state.hub.register().await;

    tracing::info!(
        "User connected: {} ({} connections)",
        conn_id,
        state.hub.connection_count().await
    );

    loop {
        tokio::select! {
            // Snapshots queued for this connection, in send order
            queued = queue.recv() => {
                match queued {
                    Some(msg) => {
                        if send_json(&mut sender, &msg).await.is_err() {
                            break;
                        }
                    }
                    // Dropped by the hub, e.g. for falling too far behind
                    None => break,
                }
            }

            // Client events
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text.as_str());

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::dispatch(
                                    client_msg,
                                    &conn_id,
                                    state.store.as_ref(),
                                    state.hub.as_ref(),
                                )
                                .await;
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::debug!("WebSocket closed by client");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    state.hub.unregister(&conn_id).await;
    tracing::info!("User disconnected: {}", conn_id);
}
