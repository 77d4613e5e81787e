use crate::hub::Outlet;
use crate::protocol::ServerMessage;
use crate::store::{Store, StoreResult};
use crate::types::{ChatView, ConnectionId};

/// Who receives a snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Connection(ConnectionId),
    All,
}

/// Read every chat, fully expanded, in creation order
pub async fn render_chats(store: &dyn Store) -> StoreResult<Vec<ChatView>> {
    let chats = store.list_chats_expanded().await?;
    if chats.is_empty() {
        tracing::debug!("No chats stored");
    }
    Ok(chats)
}

/// Re-read the whole view and push it as one `getChats` event.
///
/// There is no delta mechanism: each call costs a full read of the store and
/// one message per recipient. The outlet's snapshot lock is held from read to
/// enqueue, so the last snapshot a connection gets reflects every write that
/// completed before it was read.
pub async fn send_chats(store: &dyn Store, outlet: &dyn Outlet, target: Target) -> StoreResult<()> {
    let _guard = outlet.lock_snapshots().await;
    let chats = render_chats(store).await?;
    tracing::debug!("Sending {} chats to {:?}", chats.len(), target);

    let msg = ServerMessage::GetChats(chats);
    match target {
        Target::Connection(conn_id) => outlet.send_to(&conn_id, msg).await,
        Target::All => outlet.send_to_all(msg).await,
    }
    Ok(())
}
