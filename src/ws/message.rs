//! Message send, edit and removal.

use crate::broadcast::{self, Target};
use crate::error::{RelayError, RelayResult};
use crate::hub::Outlet;
use crate::protocol::{SendMessagePayload, UpdateMessagePayload};
use crate::store::Store;
use crate::types::{Message, MessageId};

use super::handlers::present;

/// Store a message and append it to its chat in one store call.
///
/// `chat_id` is not checked; a message sent to a missing chat is stored but
/// shows up nowhere.
pub async fn handle_send_message(
    store: &dyn Store,
    outlet: &dyn Outlet,
    payload: SendMessagePayload,
) -> RelayResult<()> {
    tracing::info!(
        "message - {:?} {} {}",
        payload.text.chars().take(50).collect::<String>(),
        payload.name,
        payload.chat_id
    );
    if payload.text.is_empty() || payload.chat_id.is_empty() {
        tracing::debug!("message without text or chatId, ignoring");
        return Ok(());
    }

    let user = store
        .find_user_by_name(&payload.name)
        .await?
        .ok_or_else(|| RelayError::UserNotFound(payload.name.clone()))?;

    store
        .append_message(Message::new(payload.text, user.id, payload.chat_id))
        .await?;

    broadcast::send_chats(store, outlet, Target::All).await?;
    Ok(())
}

/// Replace a message's text.
///
/// The broadcast goes out even when no message was referenced.
pub async fn handle_update_message(
    store: &dyn Store,
    outlet: &dyn Outlet,
    payload: UpdateMessagePayload,
) -> RelayResult<()> {
    match (payload.message, payload.text) {
        (Some(message), Some(text)) => {
            if !store.set_message_text(&message.id, &text).await? {
                tracing::debug!("updateMessage for unknown message {}", message.id);
            }
        }
        (Some(message), None) => {
            tracing::debug!("updateMessage for {} without text, skipping", message.id);
        }
        (None, _) => tracing::debug!("updateMessage without message, skipping update"),
    }

    broadcast::send_chats(store, outlet, Target::All).await?;
    Ok(())
}

/// Pull a message out of its chat, then delete it. Unknown ids are a no-op.
pub async fn handle_remove_message(
    store: &dyn Store,
    outlet: &dyn Outlet,
    id: Option<MessageId>,
) -> RelayResult<()> {
    let Some(id) = present(id) else {
        tracing::debug!("removeMessage without id, ignoring");
        return Ok(());
    };

    let Some(message) = store.find_message(&id).await? else {
        tracing::debug!("removeMessage for unknown message {}", id);
        return Ok(());
    };

    store.pull_message(&message.chat_id, &id).await?;
    store.delete_message(&id).await?;
    tracing::info!("Message {} removed from chat {}", id, message.chat_id);

    broadcast::send_chats(store, outlet, Target::All).await?;
    Ok(())
}
