//! Wire protocol for the chat relay WebSocket.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//! Payloads that clients may legitimately omit or send as `null` are
//! modelled as `Option` so that the handlers can treat them as validation
//! misses instead of parse failures.

use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Declare an identity; `userJoined` is what older clients send
    #[serde(alias = "userJoined")]
    Join(Option<String>),
    /// Post a message into a chat
    Message(SendMessagePayload),
    CreateChat(Option<CreateChatPayload>),
    RemoveChat(Option<ChatId>),
    RemoveMessage(Option<MessageId>),
    UpdateMessage(UpdateMessagePayload),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[serde(default)]
    pub text: String,
    /// Name of the sending user
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub chat_id: ChatId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatPayload {
    #[serde(default)]
    pub name: String,
    /// Name of the user who becomes the chat's author
    #[serde(default)]
    pub user_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateMessagePayload {
    #[serde(default)]
    pub message: Option<MessageRef>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Reference to a stored message; accepts `_id` from document-style clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRef {
    #[serde(alias = "_id")]
    pub id: MessageId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Full snapshot of every chat, expanded
    GetChats(Vec<ChatView>),
}
