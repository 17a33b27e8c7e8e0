//! Event fan-out engine and command dispatch
//!
//! [`DeviceHub`] is the explicitly-owned hub instance: constructed once at
//! process start over a key-value backend, then shared by reference with the
//! WebSocket listener and any REST-facing caller that needs to publish or
//! query membership. It orchestrates the connection registry, the room
//! manager, the snapshot store and the durable command queue.
//!
//! ```text
//!   REST layer ──┐                       ┌─► ConnectionRegistry
//!                ├─► Arc<DeviceHub> ─────┼─► RoomManager ──► member queues
//!   sessions  ───┘        │              ├─► SnapshotStore ─► kv backend
//!                         │              └─► CommandQueue ──► kv backend
//!                         └─ publish(): copy members, drop lock, try_send
//! ```

pub mod commands;
pub mod core;
pub mod notify;

pub use core::DeviceHub;
