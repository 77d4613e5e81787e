use super::{Store, StoreResult};
use crate::types::*;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<UserId, User>,
    /// Kept in creation order
    chats: Vec<Chat>,
    messages: HashMap<MessageId, Message>,
    /// Bumped by every write that changes something
    revision: u64,
}

/// Store backed by process memory.
///
/// One lock guards all collections, so every trait method is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of effective writes so far
    pub async fn revision(&self) -> u64 {
        self.inner.read().await.revision
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_name(&self, name: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        // Oldest match wins if duplicates slipped in through racing joins
        Ok(inner
            .users
            .values()
            .filter(|u| u.name == name)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        inner.users.insert(user.id.clone(), user.clone());
        inner.revision += 1;
        Ok(user)
    }

    async fn insert_chat(&self, chat: Chat) -> StoreResult<Chat> {
        let mut inner = self.inner.write().await;
        inner.chats.push(chat.clone());
        inner.revision += 1;
        Ok(chat)
    }

    async fn find_chat(&self, id: &str) -> StoreResult<Option<Chat>> {
        let inner = self.inner.read().await;
        Ok(inner.chats.iter().find(|c| c.id == id).cloned())
    }

    async fn delete_chat(&self, id: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.chats.len();
        inner.chats.retain(|c| c.id != id);
        let deleted = inner.chats.len() != before;
        if deleted {
            inner.revision += 1;
        }
        Ok(deleted)
    }

    async fn find_message(&self, id: &str) -> StoreResult<Option<Message>> {
        Ok(self.inner.read().await.messages.get(id).cloned())
    }

    async fn append_message(&self, message: Message) -> StoreResult<Message> {
        let mut inner = self.inner.write().await;
        inner.messages.insert(message.id.clone(), message.clone());
        if let Some(chat) = inner.chats.iter_mut().find(|c| c.id == message.chat_id) {
            chat.messages.push(message.id.clone());
            chat.updated_at = Utc::now();
        }
        inner.revision += 1;
        Ok(message)
    }

    async fn set_message_text(&self, id: &str, text: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(message) = inner.messages.get_mut(id) else {
            return Ok(false);
        };
        message.text = text.to_string();
        message.updated_at = Utc::now();
        inner.revision += 1;
        Ok(true)
    }

    async fn pull_message(&self, chat_id: &str, message_id: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let Some(chat) = inner.chats.iter_mut().find(|c| c.id == chat_id) else {
            return Ok(false);
        };
        let before = chat.messages.len();
        chat.messages.retain(|id| id != message_id);
        if chat.messages.len() == before {
            return Ok(false);
        }
        chat.updated_at = Utc::now();
        inner.revision += 1;
        Ok(true)
    }

    async fn delete_message(&self, id: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let deleted = inner.messages.remove(id).is_some();
        if deleted {
            inner.revision += 1;
        }
        Ok(deleted)
    }

    async fn list_chats_expanded(&self) -> StoreResult<Vec<ChatView>> {
        let inner = self.inner.read().await;
        let user_view = |id: &str| inner.users.get(id).map(UserView::from);

        Ok(inner
            .chats
            .iter()
            .map(|chat| ChatView {
                id: chat.id.clone(),
                name: chat.name.clone(),
                author: user_view(&chat.author),
                messages: chat
                    .messages
                    .iter()
                    .filter_map(|id| inner.messages.get(id))
                    .map(|m| MessageView {
                        id: m.id.clone(),
                        text: m.text.clone(),
                        user: user_view(&m.user),
                        chat_id: m.chat_id.clone(),
                        created_at: m.created_at,
                        updated_at: m.updated_at,
                    })
                    .collect(),
                created_at: chat.created_at,
                updated_at: chat.updated_at,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::conformance;

    #[tokio::test]
    async fn test_users() {
        conformance::users(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_chat_lifecycle() {
        conformance::chat_lifecycle(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_message_lifecycle() {
        conformance::message_lifecycle(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_append_to_missing_chat() {
        conformance::append_to_missing_chat(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_expansion_order() {
        conformance::expansion_order(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_revision_ignores_misses() {
        let store = MemoryStore::new();
        assert_eq!(store.revision().await, 0);

        store.insert_user(User::new("alice".to_string())).await.unwrap();
        assert_eq!(store.revision().await, 1);

        assert!(!store.delete_chat("nope").await.unwrap());
        assert!(!store.delete_message("nope").await.unwrap());
        assert!(!store.set_message_text("nope", "x").await.unwrap());
        assert!(!store.pull_message("nope", "nope").await.unwrap());
        assert_eq!(store.revision().await, 1);
    }
}
