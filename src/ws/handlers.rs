//! WebSocket event dispatch
//!
//! Routes each client event to its handler. Every handler returns a
//! `RelayResult`; failures are logged here and never sent back to the client.

use crate::error::{RelayError, RelayResult};
use crate::hub::Outlet;
use crate::protocol::ClientMessage;
use crate::store::Store;

use super::{chat, join, message};

/// Treat `None` and `""` the same way
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Handle one client event on behalf of `conn_id`
pub async fn handle_message(
    msg: ClientMessage,
    conn_id: &str,
    store: &dyn Store,
    outlet: &dyn Outlet,
) -> RelayResult<()> {
    match msg {
        ClientMessage::Join(name) => join::handle_join(store, outlet, conn_id, name).await,

        ClientMessage::Message(payload) => {
            message::handle_send_message(store, outlet, payload).await
        }

        ClientMessage::CreateChat(payload) => chat::handle_create_chat(store, outlet, payload).await,

        ClientMessage::RemoveChat(id) => chat::handle_remove_chat(store, outlet, id).await,

        ClientMessage::RemoveMessage(id) => {
            message::handle_remove_message(store, outlet, id).await
        }

        ClientMessage::UpdateMessage(payload) => {
            message::handle_update_message(store, outlet, payload).await
        }
    }
}

/// Handle one event and log any failure; the connection keeps going either way
pub async fn dispatch(msg: ClientMessage, conn_id: &str, store: &dyn Store, outlet: &dyn Outlet) {
    if let Err(e) = handle_message(msg, conn_id, store, outlet).await {
        match e {
            RelayError::UserNotFound(_) => {
                tracing::warn!("Handler aborted for connection {}: {}", conn_id, e)
            }
            RelayError::Store(_) => {
                tracing::error!("Store failure for connection {}: {}", conn_id, e)
            }
        }
    }
}
