//! Crate-wide error types
//!
//! Nothing in the hub is fatal to the process: authentication failures reject
//! a single handshake, validation failures are reported back to the sender,
//! and backend failures are logged while the live delivery path proceeds.

use crate::auth::AuthError;
use crate::store::StoreError;

/// Error type for hub operations
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Handshake credential was missing or failed verification
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Inbound message was malformed or of an unknown kind
    #[error("invalid message: {0}")]
    Validation(String),

    /// Key-value backend operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failed to serialize an outbound event
    #[error("event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Underlying socket error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// WebSocket protocol error
    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, HubError>;
