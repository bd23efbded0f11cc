//! Outbound request sanitizing.

use axum::http::{header, HeaderMap, HeaderValue};

use crate::http::forward::{RequestTransform, Upstream};

/// Adjusts outbound headers so the upstream answers a proxied call as if
/// it came from its own site.
///
/// - `Accept-Encoding` is removed so bodies arrive uncompressed and can be
///   rewritten.
/// - `Origin` is replaced with the upstream's own origin.
#[derive(Debug, Clone)]
pub struct RequestSanitizer {
    origin: HeaderValue,
}

impl RequestSanitizer {
    pub fn new(upstream: &Upstream) -> Self {
        Self {
            origin: upstream.origin_header().clone(),
        }
    }
}

impl RequestTransform for RequestSanitizer {
    fn transform_request(&self, headers: &mut HeaderMap) {
        headers.remove(header::ACCEPT_ENCODING);
        headers.insert(header::ORIGIN, self.origin.clone());
    }
}
