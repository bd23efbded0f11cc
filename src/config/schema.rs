//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the mirror.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default public host of the mirror.
pub const DEFAULT_HOST: &str = "vjmirror.link";

/// Environment variable overriding `mirror.host`.
pub const HOST_ENV: &str = "HOST";

/// Root configuration for the mirror.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MirrorConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream origin.
    pub upstream: UpstreamConfig,

    /// Public identity of the mirror.
    pub mirror: MirrorIdentity,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Timeouts applied by the forwarding client.
    pub timeouts: TimeoutConfig,

    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl MirrorConfig {
    /// Overlay the `HOST` environment variable onto `mirror.host`.
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var(HOST_ENV) {
            if !host.trim().is_empty() {
                self.mirror.host = host.trim().to_string();
            }
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin URL, scheme and authority only (e.g., "https://vjudge.net").
    pub origin: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            origin: "https://vjudge.net".to_string(),
        }
    }
}

/// Public identity of the mirror.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MirrorIdentity {
    /// Host name substituted for the upstream host names in bodies.
    pub host: String,
}

impl Default for MirrorIdentity {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
        }
    }
}

/// Cache store backend.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Durable store in `cache.path`.
    #[default]
    Disk,
    /// Process-local map, lost on restart.
    Memory,
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,

    /// Store directory for the disk backend.
    pub path: PathBuf,

    /// Entry lifetime in seconds (default: 30 days).
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Disk,
            path: PathBuf::from("_cache"),
            ttl_secs: 30 * 24 * 60 * 60,
        }
    }
}

/// Timeout configuration for the forwarding client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total upstream request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum buffered request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: MirrorConfig = toml::from_str("").unwrap();
        assert_eq!(config.upstream.origin, "https://vjudge.net");
        assert_eq!(config.mirror.host, DEFAULT_HOST);
        assert_eq!(config.cache.backend, CacheBackend::Disk);
        assert_eq!(config.cache.ttl(), Duration::from_secs(2_592_000));
    }

    #[test]
    fn test_partial_sections() {
        let config: MirrorConfig = toml::from_str(
            r#"
            [cache]
            backend = "memory"
            ttl_secs = 60

            [mirror]
            host = "mirror.example"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.path, PathBuf::from("_cache"));
        assert_eq!(config.mirror.host, "mirror.example");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
