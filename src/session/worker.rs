//! Inbound message dispatch
//!
//! One [`Session`] per live connection owns decoding of that connection's
//! inbound frames and drives the hub accordingly. Transport pumping lives in
//! the listener; everything here works on decoded text, which keeps the
//! dispatch logic testable without sockets.

use std::sync::Arc;

use chrono::Utc;

use crate::hub::DeviceHub;
use crate::protocol::events::name;
use crate::protocol::{
    ChatRequest, ClientMessage, CommandAck, CommandStatus, DeviceCommandRequest, ErrorEvent,
    OutboundFrame, PresenceRequest, TypingEvent,
};
use crate::registry::RoomKey;
use crate::session::{ConnectionHandle, SessionState};

/// Server side of one admitted connection
pub struct Session {
    handle: ConnectionHandle,
    hub: Arc<DeviceHub>,
    state: SessionState,
}

impl Session {
    /// Create a session for an admitted connection
    pub fn new(handle: ConnectionHandle, hub: Arc<DeviceHub>, mut state: SessionState) -> Self {
        state.joined();
        Self { handle, hub, state }
    }

    /// The session's connection handle
    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Process one inbound text frame
    ///
    /// Malformed or unknown messages produce an `error` event back to the
    /// sender; the connection stays open. No-op once the session is closed.
    pub async fn handle_text(&self, text: &str) {
        if self.state.is_closed() {
            return;
        }

        let message = match ClientMessage::parse(text) {
            Ok(message) => {
                self.hub.stats().record_message();
                message
            }
            Err(e) => {
                self.hub.stats().record_validation_failure();
                tracing::debug!(
                    conn = %self.handle.id,
                    user_id = %self.handle.identity.id,
                    error = %e,
                    "Rejected inbound message"
                );
                self.send_error("invalid message");
                return;
            }
        };

        self.dispatch(message).await;
    }

    async fn dispatch(&self, message: ClientMessage) {
        match message {
            ClientMessage::SubscribeDevice(device_id) => {
                self.hub
                    .rooms()
                    .join(&self.handle, RoomKey::Device(device_id))
                    .await;
            }
            ClientMessage::UnsubscribeDevice(device_id) => {
                self.hub
                    .rooms()
                    .leave(self.handle.id, &RoomKey::Device(device_id))
                    .await;
            }
            ClientMessage::SubscribeOrganization(org_id) => {
                self.hub
                    .rooms()
                    .join(&self.handle, RoomKey::Organization(org_id))
                    .await;
            }
            ClientMessage::DeviceCommand(request) => self.on_device_command(request).await,
            ClientMessage::Chat(request) => self.on_chat(request).await,
            ClientMessage::TypingStart(request) => {
                self.relay_presence(name::TYPING_START, request).await;
            }
            ClientMessage::TypingStop(request) => {
                self.relay_presence(name::TYPING_STOP, request).await;
            }
        }
    }

    async fn on_device_command(&self, request: DeviceCommandRequest) {
        let issued = self
            .hub
            .issue_command(
                &request.device_id,
                &request.command,
                request.payload,
                &self.handle.identity.id,
            )
            .await;

        match issued {
            Ok(command) => {
                let ack = CommandAck {
                    command_id: command.id,
                    device_id: command.device_id,
                    status: CommandStatus::Sent,
                };
                if let Ok(frame) = OutboundFrame::new(name::COMMAND_SENT, &ack) {
                    self.handle.send(frame);
                }
            }
            Err(e) => {
                tracing::warn!(conn = %self.handle.id, error = %e, "Command dispatch failed");
                self.send_error("failed to send device command");
            }
        }
    }

    async fn on_chat(&self, request: ChatRequest) {
        let event = crate::protocol::ChatEvent {
            message: request.message,
            user_id: self.handle.identity.id.clone(),
            timestamp: Utc::now(),
        };
        let Ok(frame) = OutboundFrame::new(name::CHAT_MESSAGE, &event) else {
            return;
        };

        // Relay to everyone in the room but the sender
        self.hub
            .publish_except(&RoomKey::parse(&request.room), self.handle.id, frame)
            .await;
    }

    async fn relay_presence(&self, event_name: &str, request: PresenceRequest) {
        let event = TypingEvent {
            user_id: self.handle.identity.id.clone(),
        };
        let Ok(frame) = OutboundFrame::new(event_name, &event) else {
            return;
        };

        self.hub
            .publish_except(&RoomKey::parse(&request.room), self.handle.id, frame)
            .await;
    }

    fn send_error(&self, message: &str) {
        if let Ok(frame) = OutboundFrame::new(name::ERROR, &ErrorEvent {
            message: message.to_string(),
        }) {
            self.handle.send(frame);
        }
    }

    /// Tear the session down; idempotent
    ///
    /// Removes every room membership and the direct mapping (unless a newer
    /// session already replaced it). No events flow to this connection after.
    pub async fn close(&mut self) {
        if self.state.is_closed() {
            return;
        }
        self.state.close();

        self.hub.disconnect(&self.handle).await;
        tracing::info!(
            conn = %self.handle.id,
            user_id = %self.handle.identity.id,
            peer = %self.state.peer_addr,
            uptime = ?self.state.connected_at.elapsed(),
            "Session closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::session::ConnectionId;
    use crate::store::MemoryBackend;
    use serde_json::Value;
    use tokio::sync::mpsc;

    async fn session_for(
        hub: &Arc<DeviceHub>,
        id: u64,
        user: &str,
        role: &str,
    ) -> (Session, mpsc::Receiver<OutboundFrame>) {
        let (tx, mut rx) = mpsc::channel(32);
        let handle = ConnectionHandle::new(ConnectionId(id), Identity::new(user, role), tx);

        let mut state = SessionState::new(handle.id, "127.0.0.1:9000".parse().unwrap());
        state.authenticated();
        hub.admit(&handle).await.unwrap();
        let _ = rx.recv().await; // drain the greeting

        (Session::new(handle, Arc::clone(hub), state), rx)
    }

    fn data(frame: &OutboundFrame) -> Value {
        serde_json::from_slice::<Value>(&frame.json).unwrap()["data"].clone()
    }

    #[tokio::test]
    async fn test_subscribe_then_status_delivery() {
        let hub = Arc::new(DeviceHub::new(Arc::new(MemoryBackend::new())));
        let (session, mut rx) = session_for(&hub, 1, "u1", "user").await;

        session
            .handle_text(r#"{"event":"subscribe:device","data":"d1"}"#)
            .await;

        hub.notify_device_status("d1", "error", Some(serde_json::json!({"message": "overheat"})))
            .await
            .unwrap();

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event, "device:status");
        assert_eq!(data(&frame)["status"], "error");

        session
            .handle_text(r#"{"event":"unsubscribe:device","data":"d1"}"#)
            .await;
        hub.notify_device_status("d1", "online", None).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_command_acked_to_sender() {
        let hub = Arc::new(DeviceHub::new(Arc::new(MemoryBackend::new())));
        let (session, mut rx) = session_for(&hub, 1, "u1", "user").await;

        session
            .handle_text(r#"{"event":"device:command","data":{"deviceId":"d1","command":"reboot"}}"#)
            .await;

        let ack = rx.recv().await.unwrap();
        assert_eq!(ack.event, "command:sent");
        assert_eq!(data(&ack)["deviceId"], "d1");
        assert_eq!(data(&ack)["status"], "sent");

        // Durable regardless of an empty device room
        assert_eq!(hub.command_queue().len("d1").await.unwrap(), 1);
        assert_eq!(
            hub.command_queue().pending("d1").await.unwrap()[0].issuer_id,
            "u1"
        );
    }

    #[tokio::test]
    async fn test_chat_relays_to_others_only() {
        let hub = Arc::new(DeviceHub::new(Arc::new(MemoryBackend::new())));
        let (sender, mut rx_sender) = session_for(&hub, 1, "u1", "user").await;
        let (peer, mut rx_peer) = session_for(&hub, 2, "u2", "user").await;

        sender
            .handle_text(r#"{"event":"subscribe:device","data":"d1"}"#)
            .await;
        peer.handle_text(r#"{"event":"subscribe:device","data":"d1"}"#)
            .await;

        sender
            .handle_text(r#"{"event":"chat:message","data":{"message":"hi","room":"device:d1"}}"#)
            .await;

        let frame = rx_peer.recv().await.unwrap();
        assert_eq!(frame.event, "chat:message");
        assert_eq!(data(&frame)["message"], "hi");
        assert_eq!(data(&frame)["userId"], "u1");

        assert!(rx_sender.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_typing_indicators_exclude_sender() {
        let hub = Arc::new(DeviceHub::new(Arc::new(MemoryBackend::new())));
        let (sender, mut rx_sender) = session_for(&hub, 1, "u1", "user").await;
        let (peer, mut rx_peer) = session_for(&hub, 2, "u2", "user").await;

        sender
            .handle_text(r#"{"event":"subscribe:organization","data":"o1"}"#)
            .await;
        peer.handle_text(r#"{"event":"subscribe:organization","data":"o1"}"#)
            .await;

        sender
            .handle_text(r#"{"event":"typing:start","data":{"room":"org:o1"}}"#)
            .await;
        sender
            .handle_text(r#"{"event":"typing:stop","data":{"room":"org:o1"}}"#)
            .await;

        assert_eq!(rx_peer.recv().await.unwrap().event, "typing:start");
        assert_eq!(rx_peer.recv().await.unwrap().event, "typing:stop");
        assert!(rx_sender.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_message_keeps_connection_open() {
        let hub = Arc::new(DeviceHub::new(Arc::new(MemoryBackend::new())));
        let (session, mut rx) = session_for(&hub, 1, "u1", "user").await;

        session.handle_text("{{{ nonsense").await;
        session
            .handle_text(r#"{"event":"shutdown:all","data":{}}"#)
            .await;

        assert_eq!(rx.recv().await.unwrap().event, "error");
        assert_eq!(rx.recv().await.unwrap().event, "error");
        assert_eq!(hub.stats().snapshot().validation_failures, 2);

        // Still serving after the errors
        session
            .handle_text(r#"{"event":"subscribe:device","data":"d1"}"#)
            .await;
        assert_eq!(
            hub.rooms()
                .member_count(&RoomKey::Device("d1".to_string()))
                .await,
            1
        );
    }

    #[tokio::test]
    async fn test_close_is_terminal_and_idempotent() {
        let hub = Arc::new(DeviceHub::new(Arc::new(MemoryBackend::new())));
        let (mut session, _rx) = session_for(&hub, 1, "u1", "user").await;

        session
            .handle_text(r#"{"event":"subscribe:device","data":"d1"}"#)
            .await;

        session.close().await;
        session.close().await;

        assert!(!hub.connections().is_online("u1").await);
        assert_eq!(hub.rooms().room_count().await, 0);

        // Operations against a closed session are no-ops, not errors
        session
            .handle_text(r#"{"event":"subscribe:device","data":"d2"}"#)
            .await;
        assert_eq!(hub.rooms().room_count().await, 0);
    }

    #[tokio::test]
    async fn test_disconnect_then_status_still_snapshots() {
        let hub = Arc::new(DeviceHub::new(Arc::new(MemoryBackend::new())));
        let (mut session, mut rx) = session_for(&hub, 1, "u1", "user").await;

        session
            .handle_text(r#"{"event":"subscribe:device","data":"d1"}"#)
            .await;
        session.close().await;

        hub.notify_device_status("d1", "offline", None).await.unwrap();

        assert!(rx.try_recv().is_err());
        let snap = hub
            .snapshot(crate::store::SnapshotKind::Status, "d1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snap["status"], "offline");
    }
}
