//! Cache key derivation.
//!
//! The key is the full encoded URL of the incoming request as the mirror
//! sees it: `scheme://host/path?query`. The scheme comes from the request
//! URI when absolute, else from `X-Forwarded-Proto` (set by the TLS
//! terminator in front of the mirror), else `http`.

use std::fmt;

use axum::http::{header, HeaderMap, Uri};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Full-URL cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Build the key for an incoming request.
    pub fn from_uri(uri: &Uri, headers: &HeaderMap) -> Self {
        let scheme = uri
            .scheme_str()
            .or_else(|| {
                headers
                    .get(FORWARDED_PROTO)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.split(',').next())
                    .map(str::trim)
            })
            .unwrap_or("http");

        let host = uri
            .authority()
            .map(|a| a.as_str())
            .or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()))
            .unwrap_or("localhost");

        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

        Self(format!(
            "{}://{}{}",
            scheme.to_ascii_lowercase(),
            host.to_ascii_lowercase(),
            path_and_query
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
