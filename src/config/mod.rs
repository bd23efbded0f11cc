//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → schema.rs apply_env (HOST overlay)
//!     → validation.rs (semantic checks)
//!     → MirrorConfig (validated, immutable)
//!     → shared via Arc to the pipeline
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults so the mirror runs without a file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_env_file, ConfigError};
pub use schema::MirrorConfig;
pub use schema::{CacheBackend, CacheConfig, ListenerConfig, UpstreamConfig};
pub use validation::validate_config;
