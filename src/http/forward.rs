//! Upstream forwarding.
//!
//! # Responsibilities
//! - Map an incoming request onto the single upstream origin
//! - Run the registered request transform before dispatch
//! - Dispatch with the shared HTTP client (redirects are not followed)
//! - Hand the outcome, response or not, to the registered response transform
//!
//! # Design Decisions
//! - Exactly one handler per hook, fixed at construction
//! - A failed dispatch is passed on as a missing response; the response
//!   transform decides how that surfaces
//! - The request body is buffered up to the configured limit

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::Response,
};
use reqwest::redirect;
use url::Url;

use crate::cache::CacheKey;
use crate::config::schema::TimeoutConfig;
use crate::error::MirrorError;
use crate::http::headers::strip_hop_by_hop;
use crate::observability::metrics;

/// The upstream origin and values derived from it.
#[derive(Debug, Clone)]
pub struct Upstream {
    origin: String,
    host: String,
    origin_header: HeaderValue,
}

impl Upstream {
    /// Parse an origin such as `https://vjudge.net`.
    pub fn parse(origin: &str) -> Result<Self, MirrorError> {
        let url = Url::parse(origin).map_err(|e| MirrorError::InvalidUpstreamUri(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| MirrorError::InvalidUpstreamUri(format!("'{origin}' has no host")))?
            .to_string();
        let origin = url.origin().ascii_serialization();
        let origin_header = HeaderValue::from_str(&origin)
            .map_err(|e| MirrorError::InvalidUpstreamUri(e.to_string()))?;

        Ok(Self {
            origin,
            host,
            origin_header,
        })
    }

    /// `scheme://host[:port]` without a trailing slash.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn origin_header(&self) -> &HeaderValue {
        &self.origin_header
    }

    /// Host name without port.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Upstream URL for an incoming path and query.
    pub fn url_for(&self, path_and_query: &str) -> Result<Url, MirrorError> {
        Url::parse(&format!("{}{}", self.origin, path_and_query))
            .map_err(|e| MirrorError::InvalidUpstreamUri(e.to_string()))
    }
}

/// Hook run on the outbound headers before dispatch.
pub trait RequestTransform: Send + Sync {
    fn transform_request(&self, headers: &mut HeaderMap);
}

/// Hook run once the upstream exchange has finished.
#[async_trait]
pub trait ResponseTransform: Send + Sync {
    async fn transform_response(&self, ctx: ResponseContext) -> Result<Response, MirrorError>;
}

/// A response received from upstream, body not yet read.
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl From<reqwest::Response> for UpstreamResponse {
    fn from(response: reqwest::Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            body: Body::from_stream(response.bytes_stream()),
        }
    }
}

/// Everything the response transform knows about one exchange.
pub struct ResponseContext {
    pub cache_key: CacheKey,
    pub method: Method,
    /// Path of the incoming request.
    pub path: String,
    pub upstream: Option<UpstreamResponse>,
}

/// Build the client used for upstream calls.
pub fn build_client(timeouts: &TimeoutConfig) -> Result<reqwest::Client, MirrorError> {
    let client = reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .timeout(Duration::from_secs(timeouts.request_secs))
        .build()?;
    Ok(client)
}

/// Forwards requests to the upstream and runs the two hooks around the call.
pub struct Forwarder {
    client: reqwest::Client,
    upstream: Upstream,
    max_body_size: usize,
    request_transform: Arc<dyn RequestTransform>,
    response_transform: Arc<dyn ResponseTransform>,
}

impl Forwarder {
    pub fn new(
        client: reqwest::Client,
        upstream: Upstream,
        max_body_size: usize,
        request_transform: Arc<dyn RequestTransform>,
        response_transform: Arc<dyn ResponseTransform>,
    ) -> Self {
        Self {
            client,
            upstream,
            max_body_size,
            request_transform,
            response_transform,
        }
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// Forward one request and return the transformed response.
    pub async fn forward(&self, request: Request<Body>, cache_key: CacheKey) -> Result<Response, MirrorError> {
        let (parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = self.upstream.url_for(path_and_query)?;

        let body = axum::body::to_bytes(body, self.max_body_size)
            .await
            .map_err(|e| MirrorError::RequestBody(e.to_string()))?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);
        self.request_transform.transform_request(&mut headers);

        let mut outbound = self
            .client
            .request(parts.method.clone(), url)
            .headers(headers);
        if !body.is_empty() {
            outbound = outbound.body(body);
        }

        let start = Instant::now();
        let upstream = match outbound.send().await {
            Ok(response) => {
                metrics::record_upstream(Some(response.status().as_u16()), start);
                tracing::debug!(
                    key = %cache_key,
                    status = %response.status(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Upstream responded"
                );
                Some(UpstreamResponse::from(response))
            }
            Err(e) => {
                metrics::record_upstream(None, start);
                tracing::error!(key = %cache_key, error = %e, "Upstream request failed");
                None
            }
        };

        self.response_transform
            .transform_response(ResponseContext {
                cache_key,
                method: parts.method,
                path,
                upstream,
            })
            .await
    }
}
