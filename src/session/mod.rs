//! Per-connection machinery
//!
//! A connection is one task pair: the listener's reader pumps inbound frames
//! into a [`Session`], and a writer task drains the connection's outbound
//! queue onto the socket. The [`ConnectionHandle`] is the cloneable address
//! everything else uses to reach the connection; the [`SessionState`] machine
//! guards the lifecycle (`Connecting -> Authenticated -> Joined -> Closed`).

pub mod handle;
pub mod state;
pub mod worker;

pub use handle::{ConnectionHandle, ConnectionId};
pub use state::{SessionPhase, SessionState};
pub use worker::Session;
