//! Response cache subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → key.rs (full encoded URL)
//!     → store.rs (exists / get)       ── HIT ──▶ cached bytes to client
//!
//! Upstream 200 response
//!     → policy.rs (path + suffix predicate)
//!     → store.rs (set with TTL)       ── LOST / BYPASS marker
//! ```
//!
//! # Design Decisions
//! - One key shape everywhere: the full URL of the incoming request
//! - Expiry is owned by the store, entries carry no timestamp
//! - No invalidation API; entries live until their TTL elapses

pub mod disk;
pub mod entry;
pub mod key;
pub mod memory;
pub mod policy;
pub mod status;
pub mod store;

use std::sync::Arc;

pub use disk::DiskStore;
pub use entry::CacheEntry;
pub use key::CacheKey;
pub use memory::MemoryStore;
pub use policy::CachePolicy;
pub use status::{CacheStatus, CACHE_STATUS_HEADER};
pub use store::{CacheStore, StoreError};

use crate::config::schema::{CacheBackend, CacheConfig};

/// Open the store selected by the cache configuration.
pub async fn open_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, StoreError> {
    match config.backend {
        CacheBackend::Disk => {
            let store = DiskStore::open(&config.path).await?;
            Ok(Arc::new(store))
        }
        CacheBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
