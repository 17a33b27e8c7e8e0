//! Wire contract between connections and the hub
//!
//! Inbound messages are a tagged JSON envelope `{"event": ..., "data": ...}`
//! decoded into a closed enum; anything outside that set is a validation
//! error reported back to the sender. Outbound events are typed payloads
//! serialized once into a shared [`OutboundFrame`] so fan-out to many
//! members clones a reference-counted buffer, never the JSON itself.

pub mod events;
pub mod message;

pub use events::{
    Alert, AlertSeverity, ChatEvent, Command, CommandAck, CommandStatus, ConnectedEvent,
    DataUpdate, ErrorEvent, OutboundFrame, StatusUpdate, TypingEvent,
};
pub use message::{ChatRequest, ClientMessage, DeviceCommandRequest, PresenceRequest};
