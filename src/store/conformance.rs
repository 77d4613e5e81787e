//! Behaviour every `Store` backend must share, run from each backend's tests.

use super::Store;
use crate::types::*;

pub async fn users(store: &dyn Store) {
    assert!(store.find_user_by_name("alice").await.unwrap().is_none());

    let alice = store.insert_user(User::new("alice".to_string())).await.unwrap();
    let found = store.find_user_by_name("alice").await.unwrap().unwrap();
    assert_eq!(found.id, alice.id);
    assert_eq!(found.name, "alice");

    let by_id = store.find_user(&alice.id).await.unwrap().unwrap();
    assert_eq!(by_id.name, "alice");

    assert!(store.find_user_by_name("Alice").await.unwrap().is_none());
    assert!(store.find_user("missing").await.unwrap().is_none());
}

pub async fn chat_lifecycle(store: &dyn Store) {
    let alice = store.insert_user(User::new("alice".to_string())).await.unwrap();
    let chat = store
        .insert_chat(Chat::new("general".to_string(), alice.id.clone()))
        .await
        .unwrap();

    let found = store.find_chat(&chat.id).await.unwrap().unwrap();
    assert_eq!(found.name, "general");
    assert_eq!(found.author, alice.id);
    assert!(found.messages.is_empty());

    assert!(store.delete_chat(&chat.id).await.unwrap());
    assert!(store.find_chat(&chat.id).await.unwrap().is_none());
    assert!(!store.delete_chat(&chat.id).await.unwrap());
}

pub async fn message_lifecycle(store: &dyn Store) {
    let alice = store.insert_user(User::new("alice".to_string())).await.unwrap();
    let chat = store
        .insert_chat(Chat::new("general".to_string(), alice.id.clone()))
        .await
        .unwrap();

    let first = store
        .append_message(Message::new("one".to_string(), alice.id.clone(), chat.id.clone()))
        .await
        .unwrap();
    let second = store
        .append_message(Message::new("two".to_string(), alice.id.clone(), chat.id.clone()))
        .await
        .unwrap();

    let found = store.find_chat(&chat.id).await.unwrap().unwrap();
    assert_eq!(found.messages, vec![first.id.clone(), second.id.clone()]);

    assert!(store.set_message_text(&first.id, "uno").await.unwrap());
    let edited = store.find_message(&first.id).await.unwrap().unwrap();
    assert_eq!(edited.text, "uno");
    assert_eq!(edited.user, alice.id);
    assert_eq!(edited.chat_id, chat.id);
    assert!(edited.updated_at >= edited.created_at);

    assert!(store.pull_message(&chat.id, &first.id).await.unwrap());
    assert!(!store.pull_message(&chat.id, &first.id).await.unwrap());
    assert!(store.delete_message(&first.id).await.unwrap());
    assert!(store.find_message(&first.id).await.unwrap().is_none());

    let found = store.find_chat(&chat.id).await.unwrap().unwrap();
    assert_eq!(found.messages, vec![second.id.clone()]);

    // Deleting the chat leaves its remaining message behind
    assert!(store.delete_chat(&chat.id).await.unwrap());
    assert!(store.find_message(&second.id).await.unwrap().is_some());
}

pub async fn append_to_missing_chat(store: &dyn Store) {
    let alice = store.insert_user(User::new("alice".to_string())).await.unwrap();
    let message = store
        .append_message(Message::new(
            "into the void".to_string(),
            alice.id.clone(),
            "no-such-chat".to_string(),
        ))
        .await
        .unwrap();

    assert!(store.find_message(&message.id).await.unwrap().is_some());
    assert!(store.find_chat("no-such-chat").await.unwrap().is_none());
    assert!(store.list_chats_expanded().await.unwrap().is_empty());
}

pub async fn expansion_order(store: &dyn Store) {
    let alice = store.insert_user(User::new("alice".to_string())).await.unwrap();
    let bob = store.insert_user(User::new("bob".to_string())).await.unwrap();

    let general = store
        .insert_chat(Chat::new("general".to_string(), alice.id.clone()))
        .await
        .unwrap();
    let random = store
        .insert_chat(Chat::new("random".to_string(), bob.id.clone()))
        .await
        .unwrap();

    for (i, sender) in [&alice, &bob, &alice].iter().enumerate() {
        store
            .append_message(Message::new(
                format!("msg {}", i),
                sender.id.clone(),
                general.id.clone(),
            ))
            .await
            .unwrap();
    }

    let chats = store.list_chats_expanded().await.unwrap();
    assert_eq!(chats.len(), 2);
    assert_eq!(chats[0].id, general.id);
    assert_eq!(chats[1].id, random.id);

    assert_eq!(chats[0].author.as_ref().unwrap().name, "alice");
    assert_eq!(chats[1].author.as_ref().unwrap().name, "bob");
    assert!(chats[1].messages.is_empty());

    let texts: Vec<_> = chats[0].messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["msg 0", "msg 1", "msg 2"]);
    let senders: Vec<_> = chats[0]
        .messages
        .iter()
        .map(|m| m.user.as_ref().unwrap().name.as_str())
        .collect();
    assert_eq!(senders, vec!["alice", "bob", "alice"]);

    // A message deleted without being pulled vanishes from the view
    let dangling = chats[0].messages[1].id.clone();
    store.delete_message(&dangling).await.unwrap();
    let chats = store.list_chats_expanded().await.unwrap();
    assert_eq!(chats[0].messages.len(), 2);
}
