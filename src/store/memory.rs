//! In-process key-value backend
//!
//! Implements [`KvBackend`] over a map with lazy per-key expiry. Used by
//! tests and single-process deployments; production points the same trait at
//! the external backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::backend::{KvBackend, StoreError};

enum Entry {
    Value {
        data: Bytes,
        expires_at: Option<Instant>,
    },
    List(Vec<Bytes>),
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        match self {
            Entry::Value {
                expires_at: Some(at),
                ..
            } => *at <= now,
            _ => false,
        }
    }
}

/// Map-backed [`KvBackend`] with per-key TTL
///
/// Expiry uses `tokio::time::Instant`, so tests can pause and advance time.
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry::Value {
                data: value,
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        let now = Instant::now();

        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    if let Entry::Value { data, .. } = entry {
                        return Ok(Some(data.clone()));
                    }
                    return Ok(None);
                }
                Some(_) => {} // expired, fall through to removal
                None => return Ok(None),
            }
        }

        // Lazy expiry: drop the dead entry on first read past its deadline
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn rpush(&self, key: &str, value: Bytes) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::List(Vec::new()));

        match entry {
            Entry::List(items) => {
                items.push(value);
                Ok(items.len() as u64)
            }
            Entry::Value { .. } => Err(StoreError::Unavailable(format!(
                "key {key} holds a value, not a list"
            ))),
        }
    }

    async fn list_len(&self, key: &str) -> Result<u64, StoreError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(Entry::List(items)) => Ok(items.len() as u64),
            _ => Ok(0),
        }
    }

    async fn list_range(&self, key: &str) -> Result<Vec<Bytes>, StoreError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(Entry::List(items)) => Ok(items.clone()),
            _ => Ok(Vec::new()),
        }
    }
}
