//! Key-value backend interface
//!
//! The contract the external persistence collaborator must satisfy: string
//! keys, opaque byte values, optional per-key expiry, and append-only lists.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

/// Backend failure surfaced to callers
///
/// Callers log these and keep going; persistence failures never stop live
/// delivery.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend unreachable or the operation failed
    #[error("key-value backend unavailable: {0}")]
    Unavailable(String),

    /// A stored value failed to decode
    #[error("stored value corrupt at {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Minimal key-value operations the hub relies on
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Set a value, replacing any prior one; `ttl` bounds its lifetime
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Get a value; an expired entry is equivalent to absent
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Delete a key (value or list); idempotent
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Append a value at the tail of a list, creating it if needed;
    /// returns the new list length
    async fn rpush(&self, key: &str, value: Bytes) -> Result<u64, StoreError>;

    /// Length of a list (0 for absent)
    async fn list_len(&self, key: &str) -> Result<u64, StoreError>;

    /// All entries of a list, head to tail
    async fn list_range(&self, key: &str) -> Result<Vec<Bytes>, StoreError>;
}
