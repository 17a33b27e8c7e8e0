//! Inbound message contract
//!
//! Connections send `{"event": ..., "data": ...}` envelopes. The event tag is
//! a closed set; unknown tags or malformed payloads fail decoding and are
//! reported to the sender as an `error` event.

use serde::Deserialize;
use serde_json::Value;

/// Payload of `device:command`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCommandRequest {
    pub device_id: String,
    pub command: String,
    #[serde(default)]
    pub payload: Option<Value>,
}

/// Payload of `chat:message`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub room: String,
}

/// Payload of `typing:start` / `typing:stop`
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceRequest {
    pub room: String,
}

/// Everything a connection may send after admission
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    /// Join the device's room
    #[serde(rename = "subscribe:device")]
    SubscribeDevice(String),

    /// Leave the device's room
    #[serde(rename = "unsubscribe:device")]
    UnsubscribeDevice(String),

    /// Join the organization's room
    #[serde(rename = "subscribe:organization")]
    SubscribeOrganization(String),

    /// Issue a command toward a device
    #[serde(rename = "device:command")]
    DeviceCommand(DeviceCommandRequest),

    /// Relay a chat message to the other members of a room
    #[serde(rename = "chat:message")]
    Chat(ChatRequest),

    /// Typing indicator on
    #[serde(rename = "typing:start")]
    TypingStart(PresenceRequest),

    /// Typing indicator off
    #[serde(rename = "typing:stop")]
    TypingStop(PresenceRequest),
}

impl ClientMessage {
    /// Decode an inbound text frame
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
