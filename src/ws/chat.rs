//! Chat creation and removal.

use crate::broadcast::{self, Target};
use crate::error::{RelayError, RelayResult};
use crate::hub::Outlet;
use crate::protocol::CreateChatPayload;
use crate::store::Store;
use crate::types::{Chat, ChatId};

use super::handlers::present;

pub async fn handle_create_chat(
    store: &dyn Store,
    outlet: &dyn Outlet,
    payload: Option<CreateChatPayload>,
) -> RelayResult<()> {
    let Some(payload) = payload else {
        tracing::debug!("createChat without payload, ignoring");
        return Ok(());
    };
    if payload.name.is_empty() {
        tracing::debug!("createChat without a chat name, ignoring");
        return Ok(());
    }

    let author = store
        .find_user_by_name(&payload.user_name)
        .await?
        .ok_or_else(|| RelayError::UserNotFound(payload.user_name.clone()))?;

    let chat = store.insert_chat(Chat::new(payload.name, author.id)).await?;
    tracing::info!("Chat {} ({}) created by {}", chat.name, chat.id, author.name);

    broadcast::send_chats(store, outlet, Target::All).await?;
    Ok(())
}

/// Delete a chat. Its messages stay in the store, unreferenced.
pub async fn handle_remove_chat(
    store: &dyn Store,
    outlet: &dyn Outlet,
    id: Option<ChatId>,
) -> RelayResult<()> {
    let Some(id) = present(id) else {
        tracing::debug!("removeChat without id, ignoring");
        return Ok(());
    };

    if store.delete_chat(&id).await? {
        tracing::info!("Chat {} removed", id);
    } else {
        tracing::debug!("removeChat for unknown chat {}", id);
    }

    broadcast::send_chats(store, outlet, Target::All).await?;
    Ok(())
}
