//! Cacheability policy.
//!
//! # Responsibilities
//! - Decide whether a successful upstream response may be stored
//! - Match fixed path segment prefixes (`/static`, ...)
//! - Match the file-extension allow-list
//!
//! # Design Decisions
//! - Prefixes match whole segments, ASCII case-insensitively:
//!   `/static` matches `/static` and `/Static/x`, not `/staticky`
//! - The suffix pattern is unanchored on the left and matches the
//!   extension anywhere in the path, so `/a.json` counts as `.js`
//! - Built once at startup, shared read-only

use std::sync::LazyLock;

use axum::http::StatusCode;
use regex::Regex;

/// Path prefixes whose responses are always cacheable.
pub const CACHE_PREFIXES: &[&str] = &["/static", "/problem/description", "/solution/snapshot"];

static CACHE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(png|jpg|ico|jpeg|woff|woff2|ttf|otf|cpp|js|css|svg|txt)\??(.*)$")
        .expect("cache suffix pattern is valid")
});

/// Decides which responses are written to the cache store.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    prefixes: Vec<String>,
    suffix: Regex,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            prefixes: CACHE_PREFIXES.iter().map(|p| p.to_string()).collect(),
            suffix: CACHE_SUFFIX.clone(),
        }
    }
}

impl CachePolicy {
    /// True when the path is in the cacheable set.
    pub fn is_cacheable_path(&self, path: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| starts_with_segments(path, prefix))
            || self.suffix.is_match(path)
    }

    /// Full cache decision for an upstream response.
    pub fn should_cache(&self, status: StatusCode, path: &str) -> bool {
        status.is_success() && self.is_cacheable_path(path)
    }
}

fn starts_with_segments(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if path.len() < prefix.len() || !path.is_char_boundary(prefix.len()) {
        return false;
    }
    let (head, rest) = path.split_at(prefix.len());
    head.eq_ignore_ascii_case(prefix) && (rest.is_empty() || rest.starts_with('/'))
}
