//! Body rewriting.
//!
//! A fixed, ordered table of literal substitutions applied to textual
//! upstream bodies: ad and tracker removal, branding, and replacement of
//! the upstream host names with the mirror's own host.

pub mod replacement;

pub use replacement::{Replacement, ReplacementTable, UPSTREAM_HOSTS};

/// Content types whose bodies are rewritten.
pub fn is_rewritable(content_type: &str) -> bool {
    content_type.contains("text/")
        || content_type.contains("javascript")
        || content_type.contains("json")
}
