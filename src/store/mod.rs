//! Persistence seams
//!
//! The hub's durability concerns go through a narrow key-value interface
//! ([`KvBackend`]) owned by an external backend. Two leaves sit on top of it:
//! the [`SnapshotStore`] (latest status/data event per device, bounded
//! lifetime) and the [`CommandQueue`] (per-device append-only command list,
//! drained by an out-of-band device consumer).
//!
//! A backend failure is never fatal: callers log it and the live delivery
//! path proceeds without the write.

pub mod backend;
pub mod memory;
pub mod queue;
pub mod snapshot;

pub use backend::{KvBackend, StoreError};
pub use memory::MemoryBackend;
pub use queue::CommandQueue;
pub use snapshot::{SnapshotKind, SnapshotStore};
