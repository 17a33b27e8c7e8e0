//! Real-time device communication hub
//!
//! Authenticates live bidirectional connections, tracks which parties are
//! interested in which devices/users/organizations/roles, fans device state
//! and alert events out to interested parties, and bridges commands from
//! interactive clients to intermittently-connected devices via a durable,
//! at-least-once delivery queue.
//!
//! # Architecture
//!
//! ```text
//!   client ──ws──► HubServer ──► JwtVerifier ──► Identity
//!                     │
//!                     ▼                    ┌─► ConnectionRegistry
//!          Session (1 task pair/conn) ───► │   RoomManager
//!                     │                    │   SnapshotStore ─┐
//!   REST layer ──────►└──► Arc<DeviceHub> ─┤   CommandQueue ──┼─► KvBackend
//!                                          └─► member queues (mpsc, FIFO)
//! ```
//!
//! Fan-out is best-effort and membership-driven: `publish` copies the room's
//! member list, drops the lock, and enqueues a reference-counted frame onto
//! each member's bounded queue without ever waiting on a slow consumer.
//! Durability is independent of liveness: status/data events always land in
//! the snapshot cache and issued commands always land in the per-device
//! queue, whether or not anyone is connected.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use devicehub::{DeviceHub, HubServer, MemoryBackend, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> devicehub::Result<()> {
//!     let hub = Arc::new(DeviceHub::new(Arc::new(MemoryBackend::new())));
//!
//!     // REST-facing callers share the same hub instance
//!     hub.notify_device_status("d1", "online", None).await?;
//!
//!     let config = ServerConfig::default()
//!         .bind("0.0.0.0:8080".parse().unwrap())
//!         .jwt_secret(std::env::var("HUB_JWT_SECRET").unwrap_or_default());
//!     HubServer::new(config, hub).run().await
//! }
//! ```

pub mod auth;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod store;

pub use auth::{AuthError, Identity, JwtVerifier, TokenVerifier};
pub use error::{HubError, Result};
pub use hub::DeviceHub;
pub use protocol::{Alert, AlertSeverity, ClientMessage, Command, CommandStatus, OutboundFrame};
pub use registry::{ConnectionRegistry, RoomKey, RoomManager};
pub use server::{HubServer, ServerConfig};
pub use session::{ConnectionHandle, ConnectionId, Session, SessionPhase, SessionState};
pub use stats::{HubStats, StatsSnapshot};
pub use store::{CommandQueue, KvBackend, MemoryBackend, SnapshotKind, SnapshotStore, StoreError};
