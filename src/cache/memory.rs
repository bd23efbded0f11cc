//! In-process cache store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CacheEntry, CacheKey, CacheStore, StoreError};

#[derive(Debug, Clone)]
struct MemoryEntry {
    entry: CacheEntry,
    expires_at: Instant,
}

/// A thread-safe, non-durable store backed by a `DashMap`.
///
/// Expired entries are dropped lazily when looked up.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<CacheKey, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including ones not yet pruned.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn live(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = Instant::now();
        let entry = self.inner.get(key)?;
        if entry.expires_at > now {
            return Some(entry.entry.clone());
        }
        drop(entry);
        self.inner.remove_if(key, |_, e| e.expires_at <= now);
        None
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn exists(&self, key: &CacheKey) -> Result<bool, StoreError> {
        Ok(self.live(key).is_some())
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self.live(key))
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or(StoreError::TtlOutOfRange(ttl))?;
        self.inner.insert(key.clone(), MemoryEntry { entry, expires_at });
        Ok(())
    }
}
