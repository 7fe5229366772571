//! Server-side rate-limit hints.
//!
//! When a server answers 429 it may name its own cooldown via the
//! [`RETRY_AFTER`] header. Both retry loops honor that hint over their fixed
//! backoff delay, and fall back to the fixed delay whenever the header is
//! absent or malformed. A bad header value never raises.

use http::HeaderMap;
use std::time::{Duration, SystemTime};

/// The response header carrying a server-mandated wait time.
pub const RETRY_AFTER: &str = "Retry-After";

/// Reads the [`RETRY_AFTER`] wait time from response headers.
///
/// Accepts a non-negative number of seconds (fractions allowed) or an
/// HTTP-date (RFC 7231). Returns `None` when the header is absent, not valid
/// UTF-8, negative, non-finite, too large to represent as a [`Duration`], or
/// otherwise unparseable — callers substitute their fixed delay in that case.
///
/// # Examples
///
/// ```
/// use autoauth::rate_limit::retry_after_delay;
/// use http::HeaderMap;
/// use std::time::Duration;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("retry-after", "5".parse().unwrap());
/// assert_eq!(retry_after_delay(&headers), Some(Duration::from_secs(5)));
///
/// let mut headers = HeaderMap::new();
/// headers.insert("retry-after", "soon".parse().unwrap());
/// assert_eq!(retry_after_delay(&headers), None);
/// ```
pub fn retry_after_delay(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();

    if let Ok(seconds) = value.parse::<f64>() {
        // Rejects negative, non-finite, and overflowing values.
        return Duration::try_from_secs_f64(seconds).ok();
    }

    // RFC 7231 allows an absolute HTTP-date instead of delay-seconds.
    if let Ok(at) = httpdate::parse_http_date(value) {
        if let Ok(until) = at.duration_since(SystemTime::now()) {
            return Some(until);
        }
    }

    None
}
