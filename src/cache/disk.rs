//! Durable on-disk cache store.
//!
//! # Layout
//! ```text
//! <root>/meta/<ab>/<blake3(key)>.json   entry metadata (key, type, body hash, expiry)
//! <root>/body/<cd>/<blake3(body)>       body bytes, content addressed
//! <root>/tmp/                           in-flight writes
//! ```
//!
//! # Design Decisions
//! - Every file is written under `tmp/` and renamed into place, so readers
//!   see either the previous entry or the new one
//! - The metadata rename is the commit point and happens while the index
//!   shard for the key is locked, keeping disk and index in the same order
//! - Nothing is deleted at runtime; expired metadata and unreferenced
//!   bodies are pruned when the store is opened

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::body::Bytes;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::task;

use super::{CacheEntry, CacheKey, CacheStore, StoreError};

#[derive(Debug, Clone)]
struct IndexEntry {
    body_hash: String,
    content_type: String,
    content_length: u64,
    expires_at: SystemTime,
}

impl IndexEntry {
    fn is_live(&self, now: SystemTime) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    key: String,
    content_type: String,
    body_hash: String,
    content_length: u64,
    /// Seconds since the unix epoch.
    expires_at: u64,
}

struct DiskState {
    root: PathBuf,
    index: DashMap<CacheKey, IndexEntry>,
}

/// Cache store persisted to a directory.
#[derive(Clone)]
pub struct DiskStore {
    state: Arc<DiskState>,
}

impl DiskStore {
    /// Open (or create) a store rooted at `root` and rebuild its index.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let state = Arc::new(DiskState {
            root: root.as_ref().to_path_buf(),
            index: DashMap::new(),
        });

        let rebuild = {
            let state = state.clone();
            task::spawn_blocking(move || state.rebuild())
        };
        let restored = rebuild.await??;

        tracing::info!(
            path = %state.root.display(),
            entries = restored,
            "Cache store opened"
        );
        Ok(Self { state })
    }

    /// Number of indexed entries, including expired ones not yet pruned.
    pub fn len(&self) -> usize {
        self.state.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.index.is_empty()
    }

    fn live_entry(&self, key: &CacheKey) -> Option<IndexEntry> {
        let now = SystemTime::now();
        let entry = self.state.index.get(key)?.clone();
        if entry.is_live(now) {
            return Some(entry);
        }
        tracing::trace!(key = %key, "Cache entry expired");
        self.state.index.remove_if(key, |_, e| !e.is_live(now));
        None
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn exists(&self, key: &CacheKey) -> Result<bool, StoreError> {
        Ok(self.live_entry(key).is_some())
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
        let Some(entry) = self.live_entry(key) else {
            return Ok(None);
        };

        let path = self.state.body_path(&entry.body_hash);
        match tokio::fs::read(&path).await {
            Ok(content) if content.len() as u64 != entry.content_length => {
                tracing::warn!(
                    key = %key,
                    expected = entry.content_length,
                    actual = content.len(),
                    "Cache body length mismatch"
                );
                Ok(None)
            }
            Ok(content) => Ok(Some(CacheEntry {
                content: Bytes::from(content),
                content_type: entry.content_type,
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(key = %key, path = %path.display(), "Cache body missing on disk");
                self.state
                    .index
                    .remove_if(key, |_, e| e.body_hash == entry.body_hash);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &CacheKey, entry: CacheEntry, ttl: Duration) -> Result<(), StoreError> {
        let state = self.state.clone();
        let key = key.clone();
        task::spawn_blocking(move || state.commit(key, entry, ttl)).await?
    }
}

impl DiskState {
    fn meta_dir(&self) -> PathBuf {
        self.root.join("meta")
    }

    fn body_dir(&self) -> PathBuf {
        self.root.join("body")
    }

    fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    fn body_path(&self, body_hash: &str) -> PathBuf {
        self.body_dir().join(&body_hash[..2]).join(body_hash)
    }

    fn meta_path(&self, key: &CacheKey) -> PathBuf {
        let key_hash = blake3::hash(key.as_str().as_bytes()).to_hex().to_string();
        self.meta_dir()
            .join(&key_hash[..2])
            .join(format!("{key_hash}.json"))
    }

    fn temp_path(&self) -> PathBuf {
        self.tmp_dir().join(uuid::Uuid::new_v4().to_string())
    }

    /// Stage `bytes` in a temp file ready to be renamed onto `dest`.
    fn write_temp(&self, dest: &Path, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        fs::write(&temp, bytes)?;
        Ok(temp)
    }

    fn commit(&self, key: CacheKey, entry: CacheEntry, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = SystemTime::now()
            .checked_add(ttl)
            .ok_or(StoreError::TtlOutOfRange(ttl))?;
        let body_hash = blake3::hash(&entry.content).to_hex().to_string();
        let body_path = self.body_path(&body_hash);
        if !body_path.exists() {
            let temp = self.write_temp(&body_path, &entry.content)?;
            fs::rename(&temp, &body_path)?;
        }

        let persisted = PersistedEntry {
            key: key.as_str().to_string(),
            content_type: entry.content_type.clone(),
            body_hash: body_hash.clone(),
            content_length: entry.content.len() as u64,
            expires_at: expires_at
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };
        let meta_path = self.meta_path(&key);
        let temp = self.write_temp(&meta_path, &serde_json::to_vec(&persisted)?)?;

        // The shard stays locked for one rename within `root`, a metadata-only
        // operation, so readers of the same shard wait only that long.
        let slot = self.index.entry(key);
        fs::rename(&temp, &meta_path)?;
        slot.insert(IndexEntry {
            body_hash,
            content_type: entry.content_type,
            content_length: persisted.content_length,
            expires_at,
        });
        Ok(())
    }

    /// Rebuild the index from disk. Returns the number of live entries.
    fn rebuild(&self) -> Result<usize, StoreError> {
        fs::create_dir_all(self.meta_dir())?;
        fs::create_dir_all(self.body_dir())?;
        fs::create_dir_all(self.tmp_dir())?;

        for temp in fs::read_dir(self.tmp_dir())? {
            fs::remove_file(temp?.path()).ok();
        }

        let now = SystemTime::now();
        let mut live_bodies = HashSet::new();
        for meta in shard_files(&self.meta_dir())? {
            if let Some(hash) = self.restore(&meta, now) {
                live_bodies.insert(hash);
            } else {
                fs::remove_file(&meta).ok();
            }
        }

        for body in shard_files(&self.body_dir())? {
            let referenced = body
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| live_bodies.contains(n))
                .unwrap_or(false);
            if !referenced {
                fs::remove_file(&body).ok();
            }
        }

        Ok(self.index.len())
    }

    /// Restore one metadata file; `None` means the file should be removed.
    fn restore(&self, meta: &Path, now: SystemTime) -> Option<String> {
        let data = match fs::read(meta) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %meta.display(), error = %e, "Failed to read cache metadata");
                return None;
            }
        };
        let persisted: PersistedEntry = match serde_json::from_slice(&data) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(path = %meta.display(), error = %e, "Failed to parse cache metadata");
                return None;
            }
        };

        let valid_hash = persisted.body_hash.len() == 64
            && persisted.body_hash.chars().all(|c| c.is_ascii_hexdigit());
        if !valid_hash {
            return None;
        }

        let expires_at = UNIX_EPOCH.checked_add(Duration::from_secs(persisted.expires_at))?;
        if expires_at <= now {
            return None;
        }

        let body_len = fs::metadata(self.body_path(&persisted.body_hash))
            .map(|m| m.len())
            .ok()?;
        if body_len != persisted.content_length {
            return None;
        }

        self.index.insert(
            CacheKey::new(persisted.key),
            IndexEntry {
                body_hash: persisted.body_hash.clone(),
                content_type: persisted.content_type,
                content_length: persisted.content_length,
                expires_at,
            },
        );
        Some(persisted.body_hash)
    }
}

/// Files one shard level below `dir`.
fn shard_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut files = Vec::new();
    for shard in fs::read_dir(dir)? {
        let shard = shard?;
        if !shard.file_type()?.is_dir() {
            continue;
        }
        for file in fs::read_dir(shard.path())? {
            let file = file?;
            if file.file_type()?.is_file() {
                files.push(file.path());
            }
        }
    }
    Ok(files)
}
