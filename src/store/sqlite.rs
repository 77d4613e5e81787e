//! Durable store on SQLite via `sqlx`.
//!
//! Chat membership lives in a `chat_messages` link table with an explicit
//! `position`, so message order survives deletes in the middle of a chat.

use super::{Store, StoreError, StoreResult};
use crate::types::*;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::HashMap;

const MAX_CONNECTIONS: u32 = 16;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS users_name ON users (name)",
    "CREATE TABLE IF NOT EXISTS chats (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        author TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY NOT NULL,
        text TEXT NOT NULL,
        user_id TEXT NOT NULL,
        chat_id TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS chat_messages (
        chat_id TEXT NOT NULL,
        message_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (chat_id, message_id)
    )",
];

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn encode_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {:?}: {}", raw, e)))
}

fn user_from_row(row: &SqliteRow) -> StoreResult<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: decode_time(row.try_get("created_at")?)?,
        updated_at: decode_time(row.try_get("updated_at")?)?,
    })
}

fn message_from_row(row: &SqliteRow) -> StoreResult<Message> {
    Ok(Message {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        user: row.try_get("user_id")?,
        chat_id: row.try_get("chat_id")?,
        created_at: decode_time(row.try_get("created_at")?)?,
        updated_at: decode_time(row.try_get("updated_at")?)?,
    })
}

/// Author columns from a LEFT JOIN, `None` if the user row is gone
fn joined_user(row: &SqliteRow, id_col: &str, name_col: &str) -> StoreResult<Option<UserView>> {
    let id: Option<String> = row.try_get(id_col)?;
    let name: Option<String> = row.try_get(name_col)?;
    Ok(id.zip(name).map(|(id, name)| UserView { id, name }))
}

impl SqliteStore {
    /// Connect and make sure the schema exists
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = if url.contains(":memory:") {
            // Every connection to `:memory:` is its own database, so pin one forever
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };

        let pool = options.connect(url).await?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::info!("Connected to SQLite store");
        Ok(store)
    }

    async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn chat_message_ids(&self, chat_id: &str) -> StoreResult<Vec<MessageId>> {
        let rows = sqlx::query(
            "SELECT message_id FROM chat_messages WHERE chat_id = ? ORDER BY position",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("message_id").map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn find_user_by_name(&self, name: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, created_at, updated_at FROM users
             WHERE name = ? ORDER BY created_at, id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT id, name, created_at, updated_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&self, user: User) -> StoreResult<User> {
        sqlx::query("INSERT INTO users (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(&user.id)
            .bind(&user.name)
            .bind(encode_time(&user.created_at))
            .bind(encode_time(&user.updated_at))
            .execute(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_chat(&self, chat: Chat) -> StoreResult<Chat> {
        sqlx::query(
            "INSERT INTO chats (id, name, author, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&chat.id)
        .bind(&chat.name)
        .bind(&chat.author)
        .bind(encode_time(&chat.created_at))
        .bind(encode_time(&chat.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(chat)
    }

    async fn find_chat(&self, id: &str) -> StoreResult<Option<Chat>> {
        let row = sqlx::query(
            "SELECT id, name, author, created_at, updated_at FROM chats WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Chat {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            author: row.try_get("author")?,
            messages: self.chat_message_ids(id).await?,
            created_at: decode_time(row.try_get("created_at")?)?,
            updated_at: decode_time(row.try_get("updated_at")?)?,
        }))
    }

    async fn delete_chat(&self, id: &str) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        // The link rows are part of the chat; the messages themselves stay
        sqlx::query("DELETE FROM chat_messages WHERE chat_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_message(&self, id: &str) -> StoreResult<Option<Message>> {
        let row = sqlx::query(
            "SELECT id, text, user_id, chat_id, created_at, updated_at FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(message_from_row).transpose()
    }

    async fn append_message(&self, message: Message) -> StoreResult<Message> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO messages (id, text, user_id, chat_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.text)
        .bind(&message.user)
        .bind(&message.chat_id)
        .bind(encode_time(&message.created_at))
        .bind(encode_time(&message.updated_at))
        .execute(&mut *tx)
        .await?;

        // Selecting from chats makes the link a no-op when the chat is missing
        sqlx::query(
            "INSERT INTO chat_messages (chat_id, message_id, position)
             SELECT id, ?, (SELECT COALESCE(MAX(position), 0) + 1
                            FROM chat_messages WHERE chat_id = ?)
             FROM chats WHERE id = ?",
        )
        .bind(&message.id)
        .bind(&message.chat_id)
        .bind(&message.chat_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
            .bind(encode_time(&message.created_at))
            .bind(&message.chat_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    async fn set_message_text(&self, id: &str, text: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE messages SET text = ?, updated_at = ? WHERE id = ?")
            .bind(text)
            .bind(encode_time(&Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn pull_message(&self, chat_id: &str, message_id: &str) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM chat_messages WHERE chat_id = ? AND message_id = ?")
            .bind(chat_id)
            .bind(message_id)
            .execute(&mut *tx)
            .await?;
        let pulled = result.rows_affected() > 0;
        if pulled {
            sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
                .bind(encode_time(&Utc::now()))
                .bind(chat_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(pulled)
    }

    async fn delete_message(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_chats_expanded(&self) -> StoreResult<Vec<ChatView>> {
        // Read both queries from one snapshot
        let mut tx = self.pool.begin().await?;

        let chat_rows = sqlx::query(
            "SELECT c.id, c.name, c.created_at, c.updated_at,
                    u.id AS author_id, u.name AS author_name
             FROM chats c LEFT JOIN users u ON u.id = c.author
             ORDER BY c.seq",
        )
        .fetch_all(&mut *tx)
        .await?;

        let message_rows = sqlx::query(
            "SELECT cm.chat_id AS owner, m.id, m.text, m.chat_id, m.created_at, m.updated_at,
                    u.id AS user_id, u.name AS user_name
             FROM chat_messages cm
             JOIN messages m ON m.id = cm.message_id
             LEFT JOIN users u ON u.id = m.user_id
             ORDER BY cm.chat_id, cm.position",
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut messages_by_chat: HashMap<ChatId, Vec<MessageView>> = HashMap::new();
        for row in &message_rows {
            let owner: ChatId = row.try_get("owner")?;
            messages_by_chat.entry(owner).or_default().push(MessageView {
                id: row.try_get("id")?,
                text: row.try_get("text")?,
                user: joined_user(row, "user_id", "user_name")?,
                chat_id: row.try_get("chat_id")?,
                created_at: decode_time(row.try_get("created_at")?)?,
                updated_at: decode_time(row.try_get("updated_at")?)?,
            });
        }

        chat_rows
            .iter()
            .map(|row| -> StoreResult<ChatView> {
                let id: ChatId = row.try_get("id")?;
                let messages = messages_by_chat.remove(&id).unwrap_or_default();
                Ok(ChatView {
                    author: joined_user(row, "author_id", "author_name")?,
                    name: row.try_get("name")?,
                    messages,
                    created_at: decode_time(row.try_get("created_at")?)?,
                    updated_at: decode_time(row.try_get("updated_at")?)?,
                    id,
                })
            })
            .collect()
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
