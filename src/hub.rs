//! Connection registry and fan-out.
//!
//! Every connection owns one bounded `mpsc` queue, and both "send to one" and
//! "send to all" push into it, so a socket forwards snapshots in exactly the
//! order they were queued. A connection whose queue is full is dropped from
//! the hub; its socket task sees the closed queue and disconnects.

use crate::protocol::ServerMessage;
use crate::types::{new_id, ConnectionId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex, MutexGuard, RwLock};

/// Default per-connection queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Transport capability handed to handlers
#[async_trait]
pub trait Outlet: Send + Sync {
    /// Held across render-then-send so snapshots are queued in read order
    async fn lock_snapshots(&self) -> MutexGuard<'_, ()>;

    /// Send to a single connection; unknown connections are ignored
    async fn send_to(&self, conn_id: &str, msg: ServerMessage);

    /// Send to every connected client
    async fn send_to_all(&self, msg: ServerMessage);

    /// Subscribe a connection to an addressing group
    async fn join_room(&self, conn_id: &str, room: &str);
}

struct ConnectionEntry {
    queue: mpsc::Sender<Arc<ServerMessage>>,
    rooms: HashSet<String>,
}

/// Receiving side of a registered connection
pub struct Subscription {
    pub id: ConnectionId,
    pub queue: mpsc::Receiver<Arc<ServerMessage>>,
}

impl Subscription {
    /// Next queued message without waiting
    pub fn try_next(&mut self) -> Option<Arc<ServerMessage>> {
        self.queue.try_recv().ok()
    }
}

pub struct ConnectionHub {
    capacity: usize,
    snapshot_lock: Mutex<()>,
    connections: RwLock<HashMap<ConnectionId, ConnectionEntry>>,
}

impl ConnectionHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            snapshot_lock: Mutex::new(()),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection and hand back its queue
    pub async fn register(&self) -> Subscription {
        let id = new_id();
        let (tx, rx) = mpsc::channel(self.capacity);
        self.connections.write().await.insert(
            id.clone(),
            ConnectionEntry {
                queue: tx,
                rooms: HashSet::new(),
            },
        );

        Subscription { id, queue: rx }
    }

    /// Drop a connection and its room memberships
    pub async fn unregister(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Rooms a connection currently belongs to
    pub async fn rooms_of(&self, conn_id: &str) -> Vec<String> {
        self.connections
            .read()
            .await
            .get(conn_id)
            .map(|c| c.rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Queue a message, returning false if the connection has to go
    fn enqueue(conn_id: &str, conn: &ConnectionEntry, msg: Arc<ServerMessage>) -> bool {
        match conn.queue.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Disconnecting slow connection {} (queue full)", conn_id);
                false
            }
            // Receiver gone means the socket task is shutting down
            Err(TrySendError::Closed(_)) => false,
        }
    }

    async fn remove_all(&self, ids: &[ConnectionId]) {
        if ids.is_empty() {
            return;
        }
        let mut connections = self.connections.write().await;
        for id in ids {
            connections.remove(id);
        }
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[async_trait]
impl Outlet for ConnectionHub {
    async fn lock_snapshots(&self) -> MutexGuard<'_, ()> {
        self.snapshot_lock.lock().await
    }

    async fn send_to(&self, conn_id: &str, msg: ServerMessage) {
        let keep = match self.connections.read().await.get(conn_id) {
            Some(conn) => Self::enqueue(conn_id, conn, Arc::new(msg)),
            None => {
                tracing::debug!("Dropping message for unknown connection {}", conn_id);
                true
            }
        };
        if !keep {
            self.remove_all(&[conn_id.to_string()]).await;
        }
    }

    async fn send_to_all(&self, msg: ServerMessage) {
        let msg = Arc::new(msg);
        let to_remove: Vec<ConnectionId> = {
            let connections = self.connections.read().await;
            tracing::debug!("Broadcasting to {} connections", connections.len());
            connections
                .iter()
                .filter(|(id, conn)| !Self::enqueue(id, conn, Arc::clone(&msg)))
                .map(|(id, _)| id.clone())
                .collect()
        };
        self.remove_all(&to_remove).await;
    }

    async fn join_room(&self, conn_id: &str, room: &str) {
        if let Some(conn) = self.connections.write().await.get_mut(conn_id) {
            conn.rooms.insert(room.to_string());
        }
    }
}
