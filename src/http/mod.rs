//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → gate.rs (cache hit? serve from store and stop)
//!     → forward.rs
//!         → sanitizer.rs (request hook: Accept-Encoding, Origin)
//!         → upstream call
//!         → response.rs (response hook: cookies, rewrite, cache write)
//!     → Send to client
//! ```

pub mod cookies;
pub mod forward;
pub mod gate;
pub mod headers;
pub mod request;
pub mod response;
pub mod sanitizer;
pub mod server;

pub use forward::{Forwarder, RequestTransform, ResponseContext, ResponseTransform, Upstream, UpstreamResponse};
pub use request::X_REQUEST_ID;
pub use response::ResponseProcessor;
pub use sanitizer::RequestSanitizer;
pub use server::{MirrorServer, MirrorServerBuilder};
