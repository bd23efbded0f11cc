//! Cache-hit gate.
//!
//! Runs before dispatch. A live entry for the request's full URL is served
//! straight from the store and the upstream is never contacted; otherwise
//! the computed key is attached to the request and it continues down the
//! pipeline.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::cache::{CacheEntry, CacheKey, CacheStatus, CacheStore, StoreError, CACHE_STATUS_HEADER};
use crate::error::MirrorError;
use crate::observability::metrics;

/// `Cache-Control` sent with every hit.
pub const HIT_CACHE_CONTROL: &str = "public, max-age=2592000";

/// Look up a live entry using the store's exists/get pair.
pub async fn lookup(store: &dyn CacheStore, key: &CacheKey) -> Result<Option<CacheEntry>, StoreError> {
    if !store.exists(key).await? {
        return Ok(None);
    }
    store.get(key).await
}

/// Middleware serving cache hits.
pub async fn cache_hit_gate(
    State(store): State<Arc<dyn CacheStore>>,
    mut request: Request,
    next: Next,
) -> Response {
    let key = CacheKey::from_uri(request.uri(), request.headers());

    if matches!(*request.method(), Method::GET | Method::HEAD) {
        match lookup(store.as_ref(), &key).await {
            Ok(Some(entry)) => {
                tracing::debug!(key = %key, bytes = entry.len(), "Cache hit");
                return hit_response(entry);
            }
            Ok(None) => {}
            Err(e) => return MirrorError::from(e).into_response(),
        }
    }

    request.extensions_mut().insert(key);
    next.run(request).await
}

fn hit_response(entry: CacheEntry) -> Response {
    let content_type = HeaderValue::from_str(&entry.content_type).ok();
    let length = HeaderValue::from(entry.len());

    let mut response = Response::new(Body::from(entry.content));
    let headers = response.headers_mut();
    if let Some(content_type) = content_type.filter(|v| !v.is_empty()) {
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    headers.insert(header::CONTENT_LENGTH, length);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(HIT_CACHE_CONTROL));
    headers.insert(
        CACHE_STATUS_HEADER,
        HeaderValue::from_static(CacheStatus::Hit.as_str()),
    );
    metrics::record_cache_status(CacheStatus::Hit);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::{middleware, routing::any, Extension, Router};
    use tower::ServiceExt;

    use crate::cache::MemoryStore;

    fn app(store: Arc<dyn CacheStore>) -> Router {
        Router::new()
            .route(
                "/{*path}",
                any(|Extension(key): Extension<CacheKey>| async move {
                    ([(CACHE_STATUS_HEADER, "BYPASS")], format!("upstream:{key}"))
                }),
            )
            .layer(middleware::from_fn_with_state(store, cache_hit_gate))
    }

    fn get(uri: &str) -> Request {
        Request::builder()
            .uri(uri)
            .header("Host", "vjmirror.link")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_hit_short_circuits() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &CacheKey::new("http://vjmirror.link/static/app.css"),
                CacheEntry::new("a{}", "text/css"),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let response = app(store).oneshot(get("/static/app.css")).await.unwrap();

        assert_eq!(response.headers().get(CACHE_STATUS_HEADER).unwrap(), "HIT");
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "text/css");
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            HIT_CACHE_CONTROL
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"a{}");
    }

    #[tokio::test]
    async fn test_miss_passes_key_through() {
        let store = Arc::new(MemoryStore::new());
        let response = app(store).oneshot(get("/static/app.css?v=2")).await.unwrap();

        assert_eq!(response.headers().get(CACHE_STATUS_HEADER).unwrap(), "BYPASS");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"upstream:http://vjmirror.link/static/app.css?v=2");
    }

    #[tokio::test]
    async fn test_post_is_never_served_from_cache() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &CacheKey::new("http://vjmirror.link/static/app.css"),
                CacheEntry::new("a{}", "text/css"),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/static/app.css")
            .header("Host", "vjmirror.link")
            .body(Body::empty())
            .unwrap();
        let response = app(store).oneshot(request).await.unwrap();
        assert_eq!(response.headers().get(CACHE_STATUS_HEADER).unwrap(), "BYPASS");
    }
}
