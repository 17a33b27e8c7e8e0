//! Room membership
//!
//! Rooms are created lazily on first join and removed when their last member
//! leaves, so churn never accumulates empty rooms. Both tables live under one
//! lock: a membership update is atomic with respect to concurrent snapshots,
//! and `members_of` hands out a point-in-time copy so delivery happens with
//! no lock held.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use crate::session::{ConnectionHandle, ConnectionId};

use super::key::RoomKey;

#[derive(Default)]
struct Tables {
    /// Room membership, keyed by room
    rooms: HashMap<RoomKey, HashMap<ConnectionId, ConnectionHandle>>,

    /// Rooms each connection has joined; drives `leave_all` so disconnect
    /// cost is proportional to the connection's own fan-in
    memberships: HashMap<ConnectionId, HashSet<RoomKey>>,
}

/// Manages named interest groups and connection membership in them
pub struct RoomManager {
    tables: RwLock<Tables>,
}

impl RoomManager {
    /// Create an empty room manager
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Add a connection to a room; idempotent
    pub async fn join(&self, handle: &ConnectionHandle, key: RoomKey) {
        let mut tables = self.tables.write().await;

        tables
            .rooms
            .entry(key.clone())
            .or_default()
            .insert(handle.id, handle.clone());
        let newly_joined = tables
            .memberships
            .entry(handle.id)
            .or_default()
            .insert(key.clone());

        if newly_joined {
            tracing::debug!(conn = %handle.id, user_id = %handle.identity.id, room = %key, "Joined room");
        }
    }

    /// Remove a connection from a room; idempotent
    pub async fn leave(&self, conn_id: ConnectionId, key: &RoomKey) {
        let mut tables = self.tables.write().await;

        if let Some(members) = tables.rooms.get_mut(key) {
            if members.remove(&conn_id).is_some() {
                tracing::debug!(conn = %conn_id, room = %key, "Left room");
            }
            if members.is_empty() {
                tables.rooms.remove(key);
            }
        }
        if let Some(joined) = tables.memberships.get_mut(&conn_id) {
            joined.remove(key);
            if joined.is_empty() {
                tables.memberships.remove(&conn_id);
            }
        }
    }

    /// Remove a connection from every room it joined
    ///
    /// Called once on disconnect; a no-op for unknown connections.
    pub async fn leave_all(&self, conn_id: ConnectionId) {
        let mut tables = self.tables.write().await;

        let Some(joined) = tables.memberships.remove(&conn_id) else {
            return;
        };

        for key in joined {
            if let Some(members) = tables.rooms.get_mut(&key) {
                members.remove(&conn_id);
                if members.is_empty() {
                    tables.rooms.remove(&key);
                }
            }
        }

        tracing::debug!(conn = %conn_id, "Left all rooms");
    }

    /// Point-in-time copy of a room's members
    pub async fn members_of(&self, key: &RoomKey) -> Vec<ConnectionHandle> {
        let tables = self.tables.read().await;
        tables
            .rooms
            .get(key)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Room members excluding one connection (chat/typing relay)
    pub async fn members_except(
        &self,
        key: &RoomKey,
        except: ConnectionId,
    ) -> Vec<ConnectionHandle> {
        let tables = self.tables.read().await;
        tables
            .rooms
            .get(key)
            .map(|members| {
                members
                    .values()
                    .filter(|h| h.id != except)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every live handle across all rooms, deduplicated (broadcast-to-all)
    pub async fn all_members(&self) -> Vec<ConnectionHandle> {
        let tables = self.tables.read().await;
        let mut seen = HashSet::new();
        let mut handles = Vec::new();
        for members in tables.rooms.values() {
            for handle in members.values() {
                if seen.insert(handle.id) {
                    handles.push(handle.clone());
                }
            }
        }
        handles
    }

    /// Number of members in a room
    pub async fn member_count(&self, key: &RoomKey) -> usize {
        let tables = self.tables.read().await;
        tables.rooms.get(key).map(|m| m.len()).unwrap_or(0)
    }

    /// Number of non-empty rooms
    pub async fn room_count(&self) -> usize {
        self.tables.read().await.rooms.len()
    }

    /// Rooms a connection is currently in
    pub async fn rooms_of(&self, conn_id: ConnectionId) -> Vec<RoomKey> {
        let tables = self.tables.read().await;
        tables
            .memberships
            .get(&conn_id)
            .map(|joined| joined.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use tokio::sync::mpsc;

    fn handle(id: u64, user: &str) -> ConnectionHandle {
        let (tx, _rx) = mpsc::channel(8);
        ConnectionHandle::new(ConnectionId(id), Identity::new(user, "user"), tx)
    }

    #[tokio::test]
    async fn test_join_is_idempotent() {
        let rooms = RoomManager::new();
        let h = handle(1, "u1");
        let key = RoomKey::Device("d1".to_string());

        rooms.join(&h, key.clone()).await;
        rooms.join(&h, key.clone()).await;

        assert_eq!(rooms.member_count(&key).await, 1);
        assert_eq!(rooms.rooms_of(h.id).await, vec![key]);
    }

    #[tokio::test]
    async fn test_leave_removes_empty_room() {
        let rooms = RoomManager::new();
        let h = handle(1, "u1");
        let key = RoomKey::Device("d1".to_string());

        rooms.join(&h, key.clone()).await;
        assert_eq!(rooms.room_count().await, 1);

        rooms.leave(h.id, &key).await;
        assert_eq!(rooms.room_count().await, 0);

        // Idempotent
        rooms.leave(h.id, &key).await;
        assert_eq!(rooms.member_count(&key).await, 0);
    }

    #[tokio::test]
    async fn test_leave_all_clears_every_membership() {
        let rooms = RoomManager::new();
        let h = handle(1, "u1");
        let other = handle(2, "u2");

        let keys = [
            RoomKey::User("u1".to_string()),
            RoomKey::Role("admin".to_string()),
            RoomKey::Device("d1".to_string()),
            RoomKey::Organization("o1".to_string()),
        ];
        for key in &keys {
            rooms.join(&h, key.clone()).await;
        }
        rooms.join(&other, RoomKey::Device("d1".to_string())).await;

        rooms.leave_all(h.id).await;

        for key in &keys {
            assert!(
                !rooms.members_of(key).await.iter().any(|m| m.id == h.id),
                "residual membership in {key}"
            );
        }
        assert!(rooms.rooms_of(h.id).await.is_empty());
        // Only the still-occupied device room survives
        assert_eq!(rooms.room_count().await, 1);
        assert_eq!(
            rooms.member_count(&RoomKey::Device("d1".to_string())).await,
            1
        );
    }

    #[tokio::test]
    async fn test_members_except_excludes_sender() {
        let rooms = RoomManager::new();
        let a = handle(1, "u1");
        let b = handle(2, "u2");
        let key = RoomKey::Custom("support".to_string());

        rooms.join(&a, key.clone()).await;
        rooms.join(&b, key.clone()).await;

        let others = rooms.members_except(&key, a.id).await;
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].id, b.id);
    }

    #[tokio::test]
    async fn test_no_empty_room_leak_under_churn() {
        let rooms = RoomManager::new();

        for i in 0..100 {
            let h = handle(i, &format!("u{i}"));
            rooms.join(&h, RoomKey::Device(format!("d{i}"))).await;
            rooms.leave_all(h.id).await;
        }

        assert_eq!(rooms.room_count().await, 0);
    }
}
