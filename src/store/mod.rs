#[cfg(test)]
mod conformance;
mod memory;
mod sqlite;

use crate::types::*;
use async_trait::async_trait;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// `DATABASE_URL` value that selects the in-memory backend
pub const MEMORY_URL: &str = "memory";

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to a backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Persistence gateway over users, chats and messages.
///
/// Each method is atomic on its own; there are no multi-call transactions.
/// Lookups return `Ok(None)` on a miss, and mutations report whether they
/// matched anything.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_name(&self, name: &str) -> StoreResult<Option<User>>;

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>>;

    async fn insert_user(&self, user: User) -> StoreResult<User>;

    async fn insert_chat(&self, chat: Chat) -> StoreResult<Chat>;

    async fn find_chat(&self, id: &str) -> StoreResult<Option<Chat>>;

    /// Delete a chat. Its messages are left in place.
    async fn delete_chat(&self, id: &str) -> StoreResult<bool>;

    async fn find_message(&self, id: &str) -> StoreResult<Option<Message>>;

    /// Insert a message and append its id to the owning chat in one step.
    ///
    /// If the chat does not exist the message is still stored, it just isn't
    /// referenced by any chat.
    async fn append_message(&self, message: Message) -> StoreResult<Message>;

    /// Replace a message's text, bumping `updated_at`
    async fn set_message_text(&self, id: &str, text: &str) -> StoreResult<bool>;

    /// Remove a message id from a chat's `messages` sequence
    async fn pull_message(&self, chat_id: &str, message_id: &str) -> StoreResult<bool>;

    async fn delete_message(&self, id: &str) -> StoreResult<bool>;

    /// All chats in creation order, with authors, messages and message
    /// authors expanded. Message ids that no longer resolve are dropped.
    async fn list_chats_expanded(&self) -> StoreResult<Vec<ChatView>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Open the backend named by a `DATABASE_URL`
pub async fn connect(url: &str) -> StoreResult<Arc<dyn Store>> {
    if url == MEMORY_URL {
        tracing::warn!("Using in-memory store, nothing will survive a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = SqliteStore::connect(url).await?;
    Ok(Arc::new(store))
}
