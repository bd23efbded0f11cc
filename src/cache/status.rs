//! Diagnostic cache marker.

use std::fmt;

/// Response header carrying the cache marker.
pub const CACHE_STATUS_HEADER: &str = "x-imken-cache";

/// Which path terminated a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    /// Served from the store, upstream never contacted.
    Hit,
    /// Fetched from upstream and written to the store.
    Lost,
    /// Fetched from upstream, not cached.
    Bypass,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Lost => "LOST",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
