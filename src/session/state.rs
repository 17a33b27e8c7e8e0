//! Session lifecycle state machine
//!
//! Tracks one connection from socket accept to teardown:
//! `Connecting -> Authenticated -> Joined -> Closed`. A failed handshake goes
//! straight to `Closed`; nothing transitions out of `Closed`, and operations
//! attempted against a closed session are no-ops rather than errors.

use std::net::SocketAddr;
use std::time::Instant;

use super::handle::ConnectionId;

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Socket accepted, handshake in progress
    Connecting,
    /// Credential verified, not yet in any room
    Authenticated,
    /// Default rooms joined, serving traffic
    Joined,
    /// Torn down; terminal
    Closed,
}

/// Per-connection lifecycle state
#[derive(Debug)]
pub struct SessionState {
    /// Connection id
    pub id: ConnectionId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// When the socket was accepted
    pub connected_at: Instant,
}

impl SessionState {
    /// Create state for a freshly accepted socket
    pub fn new(id: ConnectionId, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Connecting,
            connected_at: Instant::now(),
        }
    }

    /// Handshake succeeded
    pub fn authenticated(&mut self) {
        if self.phase == SessionPhase::Connecting {
            self.phase = SessionPhase::Authenticated;
        }
    }

    /// Default rooms joined
    pub fn joined(&mut self) {
        if self.phase == SessionPhase::Authenticated {
            self.phase = SessionPhase::Joined;
        }
    }

    /// Terminal transition; idempotent, from any phase
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Whether the session reached its terminal phase
    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SessionState {
        SessionState::new(ConnectionId(1), "127.0.0.1:9000".parse().unwrap())
    }

    #[test]
    fn test_happy_path() {
        let mut s = state();
        assert_eq!(s.phase, SessionPhase::Connecting);

        s.authenticated();
        assert_eq!(s.phase, SessionPhase::Authenticated);

        s.joined();
        assert_eq!(s.phase, SessionPhase::Joined);

        s.close();
        assert!(s.is_closed());
    }

    #[test]
    fn test_failed_handshake_goes_straight_to_closed() {
        let mut s = state();
        s.close();
        assert!(s.is_closed());

        // No transition leaves Closed
        s.authenticated();
        s.joined();
        assert!(s.is_closed());
    }

    #[test]
    fn test_join_requires_authentication() {
        let mut s = state();
        s.joined();
        assert_eq!(s.phase, SessionPhase::Connecting);
    }
}
