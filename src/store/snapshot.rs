//! Device snapshots
//!
//! Persists the most recent status/data event per device so a late subscriber
//! can read "current state" without waiting for the next event. At most one
//! live snapshot per (device, kind); an expired snapshot is absent.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use super::backend::{KvBackend, StoreError};

/// The two cached event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// Last `device:status` event
    Status,
    /// Last `device:data` event
    Data,
}

impl SnapshotKind {
    /// Lifetime of a snapshot of this kind
    pub fn ttl(self) -> Duration {
        match self {
            SnapshotKind::Status => Duration::from_secs(3600),
            SnapshotKind::Data => Duration::from_secs(300),
        }
    }

    /// Backend key for a device's snapshot of this kind
    pub fn key(self, device_id: &str) -> String {
        match self {
            SnapshotKind::Status => format!("device:{device_id}:status"),
            SnapshotKind::Data => format!("device:{device_id}:data"),
        }
    }
}

/// Snapshot cache over the key-value backend
pub struct SnapshotStore {
    backend: Arc<dyn KvBackend>,
}

impl SnapshotStore {
    /// Create a store over a backend
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Write a snapshot, replacing the prior one of the same kind
    pub async fn write<T: Serialize>(
        &self,
        kind: SnapshotKind,
        device_id: &str,
        payload: &T,
    ) -> Result<(), StoreError> {
        let key = kind.key(device_id);
        let json = serde_json::to_vec(payload).map_err(|source| StoreError::Corrupt {
            key: key.clone(),
            source,
        })?;
        self.backend
            .set(&key, Bytes::from(json), Some(kind.ttl()))
            .await
    }

    /// Read the live snapshot, if any
    pub async fn read(
        &self,
        kind: SnapshotKind,
        device_id: &str,
    ) -> Result<Option<Value>, StoreError> {
        let key = kind.key(device_id);
        let Some(bytes) = self.backend.get(&key).await? else {
            return Ok(None);
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { key, source })
    }
}
