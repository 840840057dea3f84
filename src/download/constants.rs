//! Constants for the download module (timeouts, rate limiting).

use std::time::Duration;

/// Connect timeout for every HTTP client (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Whole-request timeout for API metadata calls (30 seconds).
pub const API_TIMEOUT_SECS: u64 = 30;

/// Whole-request timeout for streamed file downloads (60 seconds).
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Delay applied to an HTTP 429 without a usable Retry-After header.
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

/// Upper bound for any server-mandated rate limit wait.
pub const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(10);

/// Suffix of the temporary sibling a download streams into.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Default maximum filename length after sanitization (characters).
pub const MAX_FILENAME_CHARS: usize = 150;
