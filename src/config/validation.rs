//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the upstream origin and the mirror host
//! - Validate value ranges (TTL within ten years, body limit > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MirrorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{CacheBackend, MirrorConfig};
use crate::rewrite::UPSTREAM_HOSTS;

/// Longest accepted cache TTL (ten years).
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &MirrorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.upstream.origin) {
        Ok(url) => {
            if !matches!(url.scheme(), "http" | "https") {
                errors.push(ValidationError::new("upstream.origin", "scheme must be http or https"));
            }
            if url.host_str().is_none() {
                errors.push(ValidationError::new("upstream.origin", "origin must have a host"));
            }
            if url.path() != "/" || url.query().is_some() {
                errors.push(ValidationError::new("upstream.origin", "origin must not have a path or query"));
            }
        }
        Err(e) => errors.push(ValidationError::new("upstream.origin", e.to_string())),
    }

    let host = config.mirror.host.trim();
    if host.is_empty() {
        errors.push(ValidationError::new("mirror.host", "must not be empty"));
    } else if let Some(upstream) = UPSTREAM_HOSTS.iter().find(|h| host.contains(*h)) {
        // the rewrite would no longer be idempotent
        errors.push(ValidationError::new(
            "mirror.host",
            format!("must not contain upstream host '{upstream}'"),
        ));
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::new("cache.ttl_secs", "must be greater than zero"));
    } else if config.cache.ttl_secs > MAX_TTL_SECS {
        errors.push(ValidationError::new(
            "cache.ttl_secs",
            format!("must be at most {MAX_TTL_SECS}"),
        ));
    }
    if config.cache.backend == CacheBackend::Disk && config.cache.path.as_os_str().is_empty() {
        errors.push(ValidationError::new("cache.path", "disk backend needs a path"));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than zero"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MirrorConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = MirrorConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.upstream.origin = "ftp://vjudge.net/path".into();
        config.cache.ttl_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&"listener.bind_address"));
        assert!(fields.contains(&"upstream.origin"));
        assert!(fields.contains(&"cache.ttl_secs"));
    }

    #[test]
    fn test_ttl_upper_bound() {
        let mut config = MirrorConfig::default();
        config.cache.ttl_secs = MAX_TTL_SECS;
        assert!(validate_config(&config).is_ok());

        config.cache.ttl_secs = u64::MAX;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "cache.ttl_secs");
        assert!(errors[0].message.contains("at most"));
    }

    #[test]
    fn test_mirror_host_must_not_contain_upstream_host() {
        let mut config = MirrorConfig::default();
        config.mirror.host = "vjudge.net.example.org".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "mirror.host");
    }

    #[test]
    fn test_origin_with_port_is_valid() {
        let mut config = MirrorConfig::default();
        config.upstream.origin = "http://127.0.0.1:3000".into();
        assert!(validate_config(&config).is_ok());
    }
}
