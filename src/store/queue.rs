//! Durable command queue
//!
//! Per-device append-only list at `device:<id>:commands`. Commands are
//! appended unconditionally when issued; live delivery to the device room is
//! best-effort and never a substitute for the append. Draining belongs to
//! the device-facing protocol, not this hub.

use std::sync::Arc;

use bytes::Bytes;

use crate::protocol::Command;

use super::backend::{KvBackend, StoreError};

fn queue_key(device_id: &str) -> String {
    format!("device:{device_id}:commands")
}

/// Durable per-device command list over the key-value backend
pub struct CommandQueue {
    backend: Arc<dyn KvBackend>,
}

impl CommandQueue {
    /// Create a queue over a backend
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Append a command at the tail of its device's queue;
    /// returns the queue length after the append
    pub async fn append(&self, command: &Command) -> Result<u64, StoreError> {
        let key = queue_key(&command.device_id);
        let json = serde_json::to_vec(command).map_err(|source| StoreError::Corrupt {
            key: key.clone(),
            source,
        })?;
        self.backend.rpush(&key, Bytes::from(json)).await
    }

    /// Number of queued commands for a device
    pub async fn len(&self, device_id: &str) -> Result<u64, StoreError> {
        self.backend.list_len(&queue_key(device_id)).await
    }

    /// All queued commands for a device, oldest first
    pub async fn pending(&self, device_id: &str) -> Result<Vec<Command>, StoreError> {
        let key = queue_key(device_id);
        let entries = self.backend.list_range(&key).await?;

        entries
            .into_iter()
            .map(|bytes| {
                serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                    key: key.clone(),
                    source,
                })
            })
            .collect()
    }
}
