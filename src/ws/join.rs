//! Identity handling for a connection.

use crate::broadcast::{self, Target};
use crate::error::RelayResult;
use crate::hub::Outlet;
use crate::store::Store;
use crate::types::User;

use super::handlers::present;

/// Resolve (or lazily create) the user behind `name`, put the connection in
/// that user's room, and send the current chats to this connection only.
///
/// The room is always keyed by the user id, for new and returning users alike.
/// Look-up-then-create is not atomic; two first joins racing on the same name
/// can create two users.
pub async fn handle_join(
    store: &dyn Store,
    outlet: &dyn Outlet,
    conn_id: &str,
    name: Option<String>,
) -> RelayResult<()> {
    tracing::info!("User joined: {:?}", name);
    let Some(name) = present(name) else {
        tracing::info!("Join without a name, ignoring");
        return Ok(());
    };

    let user = match store.find_user_by_name(&name).await? {
        Some(user) => user,
        None => {
            let user = store.insert_user(User::new(name)).await?;
            tracing::info!("Created user {} ({})", user.name, user.id);
            user
        }
    };

    outlet.join_room(conn_id, &user.id).await;
    broadcast::send_chats(store, outlet, Target::Connection(conn_id.to_string())).await?;
    Ok(())
}
