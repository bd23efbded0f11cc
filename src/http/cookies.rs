//! Set-Cookie domain sanitizing.

use axum::http::{header, HeaderMap, HeaderValue};

/// The literal attribute stripped from upstream cookies.
pub fn domain_attribute(upstream_host: &str) -> String {
    format!("Domain={upstream_host};")
}

/// Take every `Set-Cookie` out of `headers` and return them with the
/// upstream domain attribute removed.
///
/// Only the exact literal is removed; all other attributes are left as
/// they were. Values that are not valid after rewriting are passed on
/// unchanged.
pub fn sanitize_set_cookies(headers: &mut HeaderMap, domain_attribute: &str) -> Vec<HeaderValue> {
    let values: Vec<HeaderValue> = headers.get_all(header::SET_COOKIE).iter().cloned().collect();
    headers.remove(header::SET_COOKIE);

    values
        .into_iter()
        .map(|value| match value.to_str() {
            Ok(text) if text.contains(domain_attribute) => {
                HeaderValue::from_str(&text.replace(domain_attribute, "")).unwrap_or(value)
            }
            _ => value,
        })
        .collect()
}
