//! Response handling and transformation.
//!
//! # Responsibilities
//! - Fail the request when upstream produced no response
//! - Strip the upstream cookie domain from every `Set-Cookie`
//! - Buffer, rewrite and cache successful bodies
//! - Emit the final body once, with its real length and the cache marker
//!
//! # Design Decisions
//! - Only an exact `200 OK` to a non-HEAD request is buffered; every other
//!   response streams through untouched
//! - Cache writes happen for `GET` only, before the body is emitted
//! - Rewriting requires valid UTF-8; an undecodable text body fails the
//!   request instead of being mangled

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::Response,
};

use crate::cache::{CacheEntry, CachePolicy, CacheStatus, CacheStore, CACHE_STATUS_HEADER};
use crate::error::MirrorError;
use crate::http::cookies::{domain_attribute, sanitize_set_cookies};
use crate::http::forward::{ResponseContext, ResponseTransform, Upstream, UpstreamResponse};
use crate::http::headers::strip_hop_by_hop;
use crate::observability::metrics;
use crate::rewrite::{is_rewritable, ReplacementTable};

/// Post-dispatch stage of the mirror pipeline.
pub struct ResponseProcessor {
    table: Arc<ReplacementTable>,
    policy: Arc<CachePolicy>,
    store: Arc<dyn CacheStore>,
    cookie_domain: String,
    ttl: Duration,
}

impl ResponseProcessor {
    pub fn new(
        table: Arc<ReplacementTable>,
        policy: Arc<CachePolicy>,
        store: Arc<dyn CacheStore>,
        upstream: &Upstream,
        ttl: Duration,
    ) -> Self {
        Self {
            table,
            policy,
            store,
            cookie_domain: domain_attribute(upstream.host()),
            ttl,
        }
    }

    fn rewrite(&self, content_type: &str, body: Bytes) -> Result<Bytes, MirrorError> {
        if body.is_empty() || !is_rewritable(content_type) {
            return Ok(body);
        }
        let text = String::from_utf8(body.to_vec())?;
        Ok(Bytes::from(self.table.apply(&text)))
    }
}

#[async_trait]
impl ResponseTransform for ResponseProcessor {
    async fn transform_response(&self, ctx: ResponseContext) -> Result<Response, MirrorError> {
        let UpstreamResponse {
            status,
            mut headers,
            body,
        } = ctx.upstream.ok_or(MirrorError::NoUpstreamResponse)?;

        let cookies = sanitize_set_cookies(&mut headers, &self.cookie_domain);
        strip_hop_by_hop(&mut headers);

        if status != StatusCode::OK || ctx.method == Method::HEAD {
            tracing::debug!(key = %ctx.cache_key, status = %status, "Passing response through");
            return Ok(emit(status, headers, cookies, body, CacheStatus::Bypass));
        }

        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| MirrorError::UpstreamBody(e.to_string()))?;

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = self.rewrite(&content_type, body)?;

        let cache_status = if ctx.method == Method::GET && self.policy.should_cache(status, &ctx.path) {
            self.store
                .set(&ctx.cache_key, CacheEntry::new(body.clone(), content_type), self.ttl)
                .await?;
            metrics::record_cache_write();
            tracing::debug!(key = %ctx.cache_key, bytes = body.len(), "Cached response");
            CacheStatus::Lost
        } else {
            CacheStatus::Bypass
        };

        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        Ok(emit(status, headers, cookies, Body::from(body), cache_status))
    }
}

fn emit(
    status: StatusCode,
    mut headers: HeaderMap,
    cookies: Vec<HeaderValue>,
    body: Body,
    cache_status: CacheStatus,
) -> Response {
    for cookie in cookies {
        headers.append(header::SET_COOKIE, cookie);
    }
    headers.insert(
        CACHE_STATUS_HEADER,
        HeaderValue::from_static(cache_status.as_str()),
    );
    metrics::record_cache_status(cache_status);

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
