use crate::hub::ConnectionHub;
use crate::store::{MemoryStore, Store};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Connection registry, also the `Outlet` handed to handlers
    pub hub: Arc<ConnectionHub>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, hub: Arc<ConnectionHub>) -> Self {
        Self { store, hub }
    }

    /// State over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(ConnectionHub::default()))
    }
}
