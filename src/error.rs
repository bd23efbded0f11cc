//! Request-scoped and wiring errors.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::cache::{CacheStatus, StoreError, CACHE_STATUS_HEADER};

/// Errors produced while wiring or serving the mirror.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// The server was built without a cache store.
    #[error("cache store is not configured")]
    MissingStore,

    /// The forwarding step produced no upstream response.
    #[error("remote host returned nothing")]
    NoUpstreamResponse,

    /// The incoming request body could not be read (or was too large).
    #[error("failed to read request body: {0}")]
    RequestBody(String),

    /// The upstream body stream failed while buffering.
    #[error("failed to read upstream body: {0}")]
    UpstreamBody(String),

    /// A rewrite-eligible body was not valid UTF-8.
    #[error("upstream body is not valid UTF-8: {0}")]
    BodyDecode(#[from] std::string::FromUtf8Error),

    #[error("cache store error: {0}")]
    Store(#[from] StoreError),

    #[error("upstream client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid upstream uri: {0}")]
    InvalidUpstreamUri(String),
}

impl MirrorError {
    /// HTTP status surfaced to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            MirrorError::RequestBody(_) => StatusCode::PAYLOAD_TOO_LARGE,
            MirrorError::NoUpstreamResponse
            | MirrorError::UpstreamBody(_)
            | MirrorError::Client(_) => StatusCode::BAD_GATEWAY,
            MirrorError::MissingStore
            | MirrorError::BodyDecode(_)
            | MirrorError::Store(_)
            | MirrorError::InvalidUpstreamUri(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MirrorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!(error = %self, status = %status, "Request failed");
        crate::observability::metrics::record_cache_status(CacheStatus::Bypass);

        let mut response = (status, self.to_string()).into_response();
        response.headers_mut().insert(
            CACHE_STATUS_HEADER,
            HeaderValue::from_static(CacheStatus::Bypass.as_str()),
        );
        response
    }
}
