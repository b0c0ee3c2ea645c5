//! Connection registry: live connection -> registered client id.
//!
//! A connection has no client identity until it sends `register_client`;
//! until then disconnect cleanup is a no-op beyond clearing channel
//! subscriptions.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use dendrite_common::rwlock_read_or_recover;
use dendrite_common::rwlock_write_or_recover;

pub type ConnectionId = u64;

#[derive(Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    clients: RwLock<HashMap<ConnectionId, String>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Associate a connection with a client id. Last write wins; no
    /// error on re-registration.
    pub fn register(&self, conn: ConnectionId, client_id: &str) {
        let previous = rwlock_write_or_recover(&self.clients).insert(conn, client_id.to_string());
        if let Some(previous) = previous.filter(|p| p.as_str() != client_id) {
            info!(conn, previous, client_id, "connection re-registered");
        } else {
            info!(conn, client_id, "registered client");
        }
    }

    pub fn client_of(&self, conn: ConnectionId) -> Option<String> {
        rwlock_read_or_recover(&self.clients).get(&conn).cloned()
    }

    /// Remove and return the connection's client id, if any.
    pub fn deregister(&self, conn: ConnectionId) -> Option<String> {
        rwlock_write_or_recover(&self.clients).remove(&conn)
    }

    pub fn connection_count(&self) -> usize {
        rwlock_read_or_recover(&self.clients).len()
    }
}
