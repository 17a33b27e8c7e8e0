//! Hub instance and fan-out primitives
//!
//! Delivery is best-effort with no acknowledgement or retry: a member that
//! closes mid-delivery simply misses the event. Per-connection ordering is
//! FIFO because each member's frames go through its own bounded queue, and
//! `publish` enqueues synchronously in invocation order. The member list is
//! always copied out of the room lock before any socket or backend work.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::error::Result;
use crate::protocol::events::name;
use crate::protocol::{ConnectedEvent, OutboundFrame};
use crate::registry::{ConnectionRegistry, RoomKey, RoomManager};
use crate::session::{ConnectionHandle, ConnectionId};
use crate::stats::HubStats;
use crate::store::{CommandQueue, KvBackend, SnapshotKind, SnapshotStore};

/// The real-time device communication hub
pub struct DeviceHub {
    connections: ConnectionRegistry,
    rooms: RoomManager,
    snapshots: SnapshotStore,
    commands: CommandQueue,
    stats: HubStats,
}

impl DeviceHub {
    /// Create a hub over the given key-value backend
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            rooms: RoomManager::new(),
            snapshots: SnapshotStore::new(Arc::clone(&backend)),
            commands: CommandQueue::new(backend),
            stats: HubStats::new(),
        }
    }

    /// Connection registry (direct addressing)
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    /// Room manager (membership)
    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    /// Durable command queue
    pub fn command_queue(&self) -> &CommandQueue {
        &self.commands
    }

    /// Snapshot cache
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Delivery counters
    pub fn stats(&self) -> &HubStats {
        &self.stats
    }

    /// Admit an authenticated connection
    ///
    /// Registers the handle (last-writer-wins), joins the identity's default
    /// rooms and greets the client with a `connected` event.
    pub async fn admit(&self, handle: &ConnectionHandle) -> Result<()> {
        self.connections.register(handle.clone()).await;

        self.rooms
            .join(handle, RoomKey::User(handle.identity.id.clone()))
            .await;
        self.rooms
            .join(handle, RoomKey::Role(handle.identity.role.clone()))
            .await;

        let greeting = OutboundFrame::new(name::CONNECTED, &ConnectedEvent {
            message: "Connected to device hub".to_string(),
            user_id: handle.identity.id.clone(),
            timestamp: Utc::now(),
        })?;
        handle.send(greeting);

        Ok(())
    }

    /// Tear down a connection: every room membership goes, and the direct
    /// mapping goes unless a newer session already replaced it. Idempotent.
    pub async fn disconnect(&self, handle: &ConnectionHandle) {
        self.rooms.leave_all(handle.id).await;
        self.connections
            .unregister_if(&handle.identity.id, handle.id)
            .await;
    }

    /// Deliver a frame to every current member of a room
    ///
    /// Returns the number of members the frame was enqueued for.
    pub async fn publish(&self, key: &RoomKey, frame: OutboundFrame) -> usize {
        let members = self.rooms.members_of(key).await;
        self.deliver(key, &members, frame)
    }

    /// Deliver a frame to every member of a room except one connection
    pub async fn publish_except(
        &self,
        key: &RoomKey,
        except: ConnectionId,
        frame: OutboundFrame,
    ) -> usize {
        let members = self.rooms.members_except(key, except).await;
        self.deliver(key, &members, frame)
    }

    /// Deliver a frame to every connection in any room
    pub async fn broadcast_all(&self, frame: OutboundFrame) -> usize {
        let members = self.rooms.all_members().await;
        let delivered = members.iter().filter(|h| h.send(frame.clone())).count();
        self.stats
            .record_publish(delivered as u64, (members.len() - delivered) as u64);

        tracing::debug!(event = %frame.event, delivered, "Broadcast to all");
        delivered
    }

    fn deliver(&self, key: &RoomKey, members: &[ConnectionHandle], frame: OutboundFrame) -> usize {
        let delivered = members.iter().filter(|h| h.send(frame.clone())).count();
        self.stats
            .record_publish(delivered as u64, (members.len() - delivered) as u64);

        tracing::debug!(
            room = %key,
            event = %frame.event,
            delivered,
            members = members.len(),
            "Published event"
        );
        delivered
    }

    /// Publish an arbitrary event to a user's room (REST entry point)
    pub async fn emit_to_user<T: Serialize>(
        &self,
        user_id: &str,
        event: &str,
        data: &T,
    ) -> Result<usize> {
        let frame = OutboundFrame::new(event, data)?;
        Ok(self.publish(&RoomKey::User(user_id.to_string()), frame).await)
    }

    /// Publish an arbitrary event to a device's room (REST entry point)
    pub async fn emit_to_device<T: Serialize>(
        &self,
        device_id: &str,
        event: &str,
        data: &T,
    ) -> Result<usize> {
        let frame = OutboundFrame::new(event, data)?;
        Ok(self
            .publish(&RoomKey::Device(device_id.to_string()), frame)
            .await)
    }

    /// Publish an arbitrary event to a role's room (REST entry point)
    pub async fn emit_to_role<T: Serialize>(
        &self,
        role: &str,
        event: &str,
        data: &T,
    ) -> Result<usize> {
        let frame = OutboundFrame::new(event, data)?;
        Ok(self.publish(&RoomKey::Role(role.to_string()), frame).await)
    }

    /// Publish an arbitrary event to an organization's room (REST entry point)
    pub async fn emit_to_organization<T: Serialize>(
        &self,
        org_id: &str,
        event: &str,
        data: &T,
    ) -> Result<usize> {
        let frame = OutboundFrame::new(event, data)?;
        Ok(self
            .publish(&RoomKey::Organization(org_id.to_string()), frame)
            .await)
    }

    /// Publish an arbitrary event to every connection (REST entry point)
    pub async fn broadcast<T: Serialize>(&self, event: &str, data: &T) -> Result<usize> {
        let frame = OutboundFrame::new(event, data)?;
        Ok(self.broadcast_all(frame).await)
    }

    /// Read the live snapshot for a device, if any
    pub async fn snapshot(
        &self,
        kind: SnapshotKind,
        device_id: &str,
    ) -> Result<Option<serde_json::Value>> {
        Ok(self.snapshots.read(kind, device_id).await?)
    }
}
