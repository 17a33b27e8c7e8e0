//! Connection and room bookkeeping
//!
//! Two tables drive all routing decisions:
//!
//! ```text
//!                         Arc<DeviceHub>
//!             ┌───────────────────┬───────────────────┐
//!             │ ConnectionRegistry│    RoomManager    │
//!             │ identity → handle │ RoomKey → members │
//!             └─────────┬─────────┴─────────┬─────────┘
//!                       │                   │
//!              direct addressing       room fan-out
//!              (last-writer-wins)    (membership-driven)
//! ```
//!
//! The registry answers "is this identity reachable right now"; the room
//! manager answers "who cares about this device/user/role/organization".
//! Broadcast delivery is driven by membership alone, so a displaced direct
//! mapping never affects room fan-out.

pub mod connections;
pub mod key;
pub mod rooms;

pub use connections::ConnectionRegistry;
pub use key::RoomKey;
pub use rooms::RoomManager;
