//! Cache store abstraction.

use std::time::Duration;

use async_trait::async_trait;

use super::{CacheEntry, CacheKey};

/// Errors from a cache store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache metadata error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("cache task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("cache ttl of {}s is out of range", .0.as_secs())]
    TtlOutOfRange(Duration),
}

/// Key-value store with per-entry TTL.
///
/// Implementations must be safe for concurrent use on the same key;
/// concurrent `set` calls resolve as last-writer-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// True if a live (unexpired) entry exists for the key.
    async fn exists(&self, key: &CacheKey) -> Result<bool, StoreError>;

    /// Fetch the live entry for the key.
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError>;

    /// Write an entry, replacing any previous one, expiring after `ttl`.
    async fn set(&self, key: &CacheKey, entry: CacheEntry, ttl: Duration) -> Result<(), StoreError>;
}
