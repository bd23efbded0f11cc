//! Cached response value.

use axum::body::Bytes;

/// A cached body and the content type it was served with.
///
/// Entries are immutable; a later write for the same key replaces the
/// whole entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub content: Bytes,
    pub content_type: String,
}

impl CacheEntry {
    pub fn new(content: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
        }
    }

    /// Body length in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
