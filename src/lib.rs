//! Caching, rewriting reverse-proxy mirror for a single upstream site.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;

pub use config::MirrorConfig;
pub use error::MirrorError;
pub use http::MirrorServer;
pub use lifecycle::Shutdown;
