//! Retry-After handling for HTTP 429 responses.

use std::time::Duration;

use tracing::{debug, warn};

use super::constants::{DEFAULT_RATE_LIMIT_WAIT, MAX_RATE_LIMIT_WAIT};

/// Parses a Retry-After header value into a Duration.
///
/// Supports both formats defined in RFC 7231:
/// - Integer seconds: `"120"` → 120 seconds
/// - HTTP-date: `"Wed, 21 Oct 2015 07:28:00 GMT"` → duration until that time
///
/// Returns `None` for negative values, dates in the past, or unparsable input.
/// Values are capped at [`MAX_RATE_LIMIT_WAIT`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use canvas_dl_core::download::parse_retry_after;
///
/// assert_eq!(parse_retry_after("3"), Some(Duration::from_secs(3)));
/// assert_eq!(parse_retry_after("600"), Some(Duration::from_secs(10)));
/// assert_eq!(parse_retry_after("-1"), None);
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    // Integer seconds first (what Canvas sends)
    if let Ok(seconds) = header_value.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        }
        return Some(cap(Duration::from_secs_f64(seconds.min(
            MAX_RATE_LIMIT_WAIT.as_secs_f64(),
        ))));
    }

    if let Ok(datetime) = httpdate::parse_http_date(header_value) {
        return match datetime.duration_since(std::time::SystemTime::now()) {
            Ok(duration) => Some(cap(duration)),
            Err(_) => {
                debug!(header_value, "Retry-After date is in the past, ignoring");
                None
            }
        };
    }

    warn!(header_value, "unparsable Retry-After header");
    None
}

/// Delay to honour for a 429 response carrying `header`.
///
/// Falls back to [`DEFAULT_RATE_LIMIT_WAIT`] when the header is missing or invalid.
#[must_use]
pub fn rate_limit_delay(header: Option<&str>) -> Duration {
    header
        .and_then(parse_retry_after)
        .unwrap_or(DEFAULT_RATE_LIMIT_WAIT)
}

fn cap(duration: Duration) -> Duration {
    if duration > MAX_RATE_LIMIT_WAIT {
        debug!(
            delay_secs = duration.as_secs(),
            max_secs = MAX_RATE_LIMIT_WAIT.as_secs(),
            "Retry-After exceeds maximum, capping"
        );
        MAX_RATE_LIMIT_WAIT
    } else {
        duration
    }
}
