//! Connection registry
//!
//! The single source of truth for "is this identity directly reachable".
//! One live handle per identity id, last-writer-wins: a second session for
//! the same identity displaces the first for direct addressing, while room
//! broadcast delivery stays membership-driven and is unaffected.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::auth::Identity;
use crate::session::{ConnectionHandle, ConnectionId};

/// Registry of live connections, keyed by identity id
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Record a live connection for its identity
    ///
    /// Last-writer-wins: returns the displaced handle if the identity already
    /// had one.
    pub async fn register(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let mut connections = self.connections.write().await;
        let displaced = connections.insert(handle.identity.id.clone(), handle.clone());

        if displaced.is_some() {
            tracing::info!(
                user_id = %handle.identity.id,
                conn = %handle.id,
                "Connection registered (displaced prior session)"
            );
        } else {
            tracing::info!(
                user_id = %handle.identity.id,
                conn = %handle.id,
                "Connection registered"
            );
        }

        displaced
    }

    /// Remove the mapping for an identity; idempotent
    pub async fn unregister(&self, identity_id: &str) {
        let mut connections = self.connections.write().await;
        if connections.remove(identity_id).is_some() {
            tracing::info!(user_id = %identity_id, "Connection unregistered");
        }
    }

    /// Remove the mapping only if it still points at the given connection
    ///
    /// A stale disconnect arriving after the identity reconnected must not
    /// evict the newer session.
    pub async fn unregister_if(&self, identity_id: &str, conn_id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if connections.get(identity_id).map(|h| h.id) == Some(conn_id) {
            connections.remove(identity_id);
            tracing::info!(user_id = %identity_id, conn = %conn_id, "Connection unregistered");
        }
    }

    /// Get the current handle for an identity, if online
    pub async fn get(&self, identity_id: &str) -> Option<ConnectionHandle> {
        self.connections.read().await.get(identity_id).cloned()
    }

    /// Whether the identity has a live connection
    pub async fn is_online(&self, identity_id: &str) -> bool {
        self.connections.read().await.contains_key(identity_id)
    }

    /// Number of live connections
    pub async fn online_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Identities currently online
    pub async fn online_identities(&self) -> Vec<Identity> {
        self.connections
            .read()
            .await
            .values()
            .map(|h| (*h.identity).clone())
            .collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
