use chatrelay::api::router;
use chatrelay::broadcast::render_chats;
use chatrelay::state::AppState;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> String {
    spawn_server_with_state().await.0
}

async fn spawn_server_with_state() -> (String, Arc<AppState>) {
    let state = Arc::new(AppState::in_memory());
    let app = router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("ws://{}/ws", addr), state)
}

async fn emit(client: &mut Client, event: &str, data: Value) {
    let frame = json!({ "event": event, "data": data }).to_string();
    client.send(Message::Text(frame.into())).await.unwrap();
}

/// Wait for the next `getChats` payload
async fn next_chats(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timed out waiting for getChats")
            .expect("Connection closed")
            .unwrap();
        if let Ok(text) = msg.to_text() {
            if text.is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(text).unwrap();
            assert_eq!(value["event"], "getChats");
            return value["data"].clone();
        }
    }
}

/// Read until the socket goes quiet, returning the last `getChats` payload
async fn drain_chats(client: &mut Client) -> Option<Value> {
    let mut latest = None;
    while let Ok(Some(msg)) = tokio::time::timeout(Duration::from_millis(150), client.next()).await {
        if let Ok(text) = msg.unwrap().to_text() {
            if !text.is_empty() {
                let value: Value = serde_json::from_str(text).unwrap();
                latest = Some(value["data"].clone());
            }
        }
    }
    latest
}

/// Expect silence for a short while
async fn assert_quiet(client: &mut Client) {
    let result = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(result.is_err(), "Expected no frame, got {:?}", result);
}

#[tokio::test]
async fn test_websocket_session() {
    let url = spawn_server().await;
    let (mut a, _) = connect_async(url.as_str()).await.unwrap();
    let (mut b, _) = connect_async(url.as_str()).await.unwrap();

    // A reply proves B is registered before anything is broadcast
    emit(&mut b, "join", json!("bob")).await;
    assert_eq!(next_chats(&mut b).await, json!([]));

    emit(&mut a, "join", json!("alice")).await;
    assert_eq!(next_chats(&mut a).await, json!([]));
    assert_quiet(&mut b).await;

    emit(&mut a, "createChat", json!({ "name": "general", "userName": "alice" })).await;
    let chats = next_chats(&mut b).await;
    assert_eq!(chats[0]["name"], "general");
    assert_eq!(chats[0]["author"]["name"], "alice");
    let general = chats[0]["id"].as_str().unwrap().to_string();
    next_chats(&mut a).await;

    emit(
        &mut a,
        "message",
        json!({ "text": "hi", "name": "alice", "chatId": general }),
    )
    .await;
    let chats = next_chats(&mut a).await;
    assert_eq!(chats[0]["messages"][0]["text"], "hi");
    assert_eq!(chats[0]["messages"][0]["user"]["name"], "alice");
    let message_id = chats[0]["messages"][0]["id"].clone();
    next_chats(&mut b).await;

    emit(&mut b, "removeMessage", message_id).await;
    let chats = next_chats(&mut b).await;
    assert_eq!(chats[0]["messages"], json!([]));
    let chats = next_chats(&mut a).await;
    assert_eq!(chats[0]["messages"], json!([]));
}

#[tokio::test]
async fn test_garbage_frames_are_dropped() {
    let url = spawn_server().await;
    let (mut a, _) = connect_async(url.as_str()).await.unwrap();

    a.send(Message::Text("not json".into())).await.unwrap();
    emit(&mut a, "createChat", json!({ "name": "general", "userName": "ghost" })).await;
    assert_quiet(&mut a).await;

    // The connection is still served afterwards
    emit(&mut a, "userJoined", json!("alice")).await;
    assert_eq!(next_chats(&mut a).await, json!([]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_join_snapshot_never_overtakes_broadcasts() {
    let (url, state) = spawn_server_with_state().await;
    let (mut b, _) = connect_async(url.as_str()).await.unwrap();
    emit(&mut b, "join", json!("bob")).await;
    next_chats(&mut b).await;

    for trial in 0..25 {
        let (mut a, _) = connect_async(url.as_str()).await.unwrap();

        tokio::join!(emit(&mut a, "join", json!(format!("alice{}", trial))), async {
            for i in 0..3 {
                emit(
                    &mut b,
                    "createChat",
                    json!({ "name": format!("chat {}-{}", trial, i), "userName": "bob" }),
                )
                .await;
            }
        });
        for _ in 0..3 {
            next_chats(&mut b).await;
        }

        let last = drain_chats(&mut a).await.expect("Joiner got no snapshot");
        let stored = render_chats(state.store.as_ref()).await.unwrap();
        assert_eq!(
            last.as_array().unwrap().len(),
            stored.len(),
            "Trial {} ended on a stale snapshot",
            trial
        );

        a.close(None).await.unwrap();
    }
}
