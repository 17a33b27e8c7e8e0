//! Connection handle
//!
//! A cheap-to-clone address for one live connection. Everything the hub
//! fans out goes through the handle's bounded outbound queue; the session's
//! writer task drains that queue in FIFO order onto the socket.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::auth::Identity;
use crate::protocol::OutboundFrame;

/// Unique id for a live connection, allocated by the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Handle to a live, authenticated connection
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Connection id
    pub id: ConnectionId,

    /// Immutable identity established at the handshake
    pub identity: Arc<Identity>,

    /// Outbound frame queue, drained by the connection's writer task
    outbound: mpsc::Sender<OutboundFrame>,
}

impl ConnectionHandle {
    /// Create a handle over an outbound queue
    pub fn new(id: ConnectionId, identity: Identity, outbound: mpsc::Sender<OutboundFrame>) -> Self {
        Self {
            id,
            identity: Arc::new(identity),
            outbound,
        }
    }

    /// Enqueue a frame for this connection, without waiting
    ///
    /// Best-effort: a full queue (slow consumer) or a closed connection drops
    /// the frame for this member only. Returns whether the frame was queued.
    pub fn send(&self, frame: OutboundFrame) -> bool {
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(frame)) => {
                tracing::warn!(
                    conn = %self.id,
                    user_id = %self.identity.id,
                    event = %frame.event,
                    "Outbound queue full, dropping event"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the connection's writer is still draining the queue
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{events::name, ErrorEvent};

    fn frame() -> OutboundFrame {
        OutboundFrame::new(name::ERROR, &ErrorEvent {
            message: "x".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_is_fifo() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = ConnectionHandle::new(ConnectionId(1), Identity::new("u1", "user"), tx);

        for event in ["a", "b", "c"] {
            let f = OutboundFrame::new(event, &ErrorEvent {
                message: event.to_string(),
            })
            .unwrap();
            assert!(handle.send(f));
        }

        assert_eq!(rx.recv().await.unwrap().event, "a");
        assert_eq!(rx.recv().await.unwrap().event, "b");
        assert_eq!(rx.recv().await.unwrap().event, "c");
    }

    #[tokio::test]
    async fn test_send_drops_when_full() {
        let (tx, _rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(ConnectionId(1), Identity::new("u1", "user"), tx);

        assert!(handle.send(frame()));
        // Queue capacity exhausted; the frame is dropped, not awaited
        assert!(!handle.send(frame()));
    }

    #[tokio::test]
    async fn test_send_after_close() {
        let (tx, rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(ConnectionId(1), Identity::new("u1", "user"), tx);
        drop(rx);

        assert!(!handle.is_open());
        assert!(!handle.send(frame()));
    }
}
