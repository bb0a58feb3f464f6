//! `Retry-After` header parsing

use http::HeaderMap;

/// Seconds to wait according to a `Retry-After` value.
///
/// Accepts delay-seconds (`"30"`) or an HTTP-date. Dates in the past yield
/// `Some(0)`; anything else unparseable yields `None`.
pub fn parse_retry_after(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(seconds);
    }

    let at = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let remaining = at.signed_duration_since(chrono::Utc::now()).num_seconds();
    Some(remaining.max(0) as u64)
}

/// `Retry-After` from a response header map
pub fn retry_after_from_headers(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(http::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after)
}
