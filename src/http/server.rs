//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wire the pipeline: gate → sanitizer → forwarder → processor
//! - Create the Axum router and its middleware stack (request ID, tracing)
//! - Refuse to build without a cache store
//! - Serve on a listener until shutdown
//!
//! # Middleware order (outermost first)
//! ```text
//! SetRequestId → Trace → PropagateRequestId → cache_hit_gate → proxy_handler
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::cache::{CacheKey, CachePolicy, CacheStore};
use crate::config::MirrorConfig;
use crate::error::MirrorError;
use crate::http::forward::{build_client, Forwarder, Upstream};
use crate::http::gate::cache_hit_gate;
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::http::response::ResponseProcessor;
use crate::http::sanitizer::RequestSanitizer;
use crate::lifecycle::shutdown;
use crate::rewrite::ReplacementTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the mirror.
pub struct MirrorServer {
    router: Router,
}

/// Builder for [`MirrorServer`].
pub struct MirrorServerBuilder {
    config: MirrorConfig,
    store: Option<Arc<dyn CacheStore>>,
    client: Option<reqwest::Client>,
}

impl MirrorServerBuilder {
    /// Cache store used by the gate and the processor. Required.
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Upstream client; defaults to one built from `timeouts`.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<MirrorServer, MirrorError> {
        let store = self.store.ok_or(MirrorError::MissingStore)?;
        let config = self.config;

        let upstream = Upstream::parse(&config.upstream.origin)?;
        let client = match self.client {
            Some(client) => client,
            None => build_client(&config.timeouts)?,
        };

        let table = Arc::new(ReplacementTable::new(&config.mirror.host));
        let policy = Arc::new(CachePolicy::default());

        let sanitizer = Arc::new(RequestSanitizer::new(&upstream));
        let processor = Arc::new(ResponseProcessor::new(
            table,
            policy,
            store.clone(),
            &upstream,
            config.cache.ttl(),
        ));
        let forwarder = Arc::new(Forwarder::new(
            client,
            upstream,
            config.security.max_body_size,
            sanitizer,
            processor,
        ));

        tracing::info!(
            upstream = %forwarder.upstream().origin(),
            host = %config.mirror.host,
            ttl_secs = config.cache.ttl_secs,
            "Mirror pipeline built"
        );

        Ok(MirrorServer {
            router: build_router(AppState { forwarder }, store),
        })
    }
}

impl MirrorServer {
    pub fn builder(config: MirrorConfig) -> MirrorServerBuilder {
        MirrorServerBuilder {
            config,
            store: None,
            client: None,
        }
    }

    /// The configured router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn build_router(state: AppState, store: Arc<dyn CacheStore>) -> Router {
    Router::new()
        .fallback(proxy_handler)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        request_id = %request_id(request),
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                .layer(middleware::from_fn_with_state(store, cache_hit_gate)),
        )
}

/// Forward a cache miss upstream.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let key = request
        .extensions()
        .get::<CacheKey>()
        .cloned()
        .unwrap_or_else(|| CacheKey::from_uri(request.uri(), request.headers()));

    tracing::debug!(key = %key, method = %request.method(), "Cache miss, forwarding");

    match state.forwarder.forward(request, key).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::http::{header, StatusCode};
    use tower::ServiceExt;

    use crate::cache::{CacheEntry, MemoryStore, CACHE_STATUS_HEADER};

    fn server(store: Arc<MemoryStore>) -> MirrorServer {
        let mut config = MirrorConfig::default();
        // nothing listens here; a miss must not reach a real site
        config.upstream.origin = "http://127.0.0.1:9".to_string();
        MirrorServer::builder(config).store(store).build().unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::HOST, "vjmirror.link")
            .header(X_REQUEST_ID, "req-1")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_router_serves_cached_entry() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &CacheKey::new("http://vjmirror.link/static/app.js"),
                CacheEntry::new("run()", "application/javascript"),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let response = server(store).router().oneshot(get("/static/app.js")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CACHE_STATUS_HEADER).unwrap(), "HIT");
        assert_eq!(response.headers().get(X_REQUEST_ID).unwrap(), "req-1");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"run()");
    }

    #[tokio::test]
    async fn test_router_generates_request_id() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                &CacheKey::new("http://vjmirror.link/favicon.ico"),
                CacheEntry::new("ico", "image/x-icon"),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let request = Request::builder()
            .uri("/favicon.ico")
            .header(header::HOST, "vjmirror.link")
            .body(Body::empty())
            .unwrap();
        let response = server(store).router().oneshot(request).await.unwrap();

        let id = response.headers().get(X_REQUEST_ID).unwrap().to_str().unwrap();
        assert_eq!(id.len(), 36);
    }
}
