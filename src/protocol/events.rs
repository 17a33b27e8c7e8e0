//! Outbound event types
//!
//! Each event kind has a typed payload struct; [`OutboundFrame`] carries the
//! serialized envelope as `Bytes` so every room member shares one allocation.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Outbound event names
pub mod name {
    pub const CONNECTED: &str = "connected";
    pub const DEVICE_STATUS: &str = "device:status";
    pub const DEVICE_DATA: &str = "device:data";
    pub const DEVICE_COMMAND: &str = "device:command";
    pub const ALERT: &str = "alert";
    pub const COMMAND_SENT: &str = "command:sent";
    pub const CHAT_MESSAGE: &str = "chat:message";
    pub const TYPING_START: &str = "typing:start";
    pub const TYPING_STOP: &str = "typing:stop";
    pub const ERROR: &str = "error";
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    event: &'a str,
    data: &'a T,
}

/// A serialized event ready for fan-out
///
/// Cheap to clone: the JSON body is reference-counted via `Bytes`.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    /// Event name (for logging and delivery accounting)
    pub event: String,
    /// Serialized `{"event": ..., "data": ...}` envelope
    pub json: Bytes,
}

impl OutboundFrame {
    /// Serialize a payload into a frame under the given event name
    pub fn new<T: Serialize>(event: &str, data: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_vec(&Envelope { event, data })?;
        Ok(Self {
            event: event.to_string(),
            json: Bytes::from(json),
        })
    }
}

/// Greeting sent to a connection on admission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedEvent {
    pub message: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Device status change, also cached as the status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub device_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// Device telemetry update, also cached as the data snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUpdate {
    pub device_id: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

/// Command delivery status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    /// Queued, not yet consumed by the device
    Pending,
    /// Accepted by the hub and broadcast to live listeners
    Sent,
}

/// A command issued toward a device
///
/// Never mutated after creation by this subsystem; status transitions beyond
/// `pending` belong to the device-facing consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: Uuid,
    pub device_id: String,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub issuer_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: CommandStatus,
}

/// Acknowledgement returned to the command issuer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandAck {
    pub command_id: Uuid,
    pub device_id: String,
    pub status: CommandStatus,
}

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    /// Critical alerts additionally reach the admin role room
    pub fn is_critical(self) -> bool {
        matches!(self, AlertSeverity::Critical)
    }
}

/// An alert routed to its target rooms; ephemeral, never persisted here
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Chat message relayed to the other members of a room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    pub message: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Typing indicator relayed to the other members of a room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub user_id: String,
}

/// Error reported to a sender; the connection stays open
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub message: String,
}
