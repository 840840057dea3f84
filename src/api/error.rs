//! Error types for the Canvas API client.

use std::time::Duration;

use thiserror::Error;

use crate::download::FailureType;

/// Maximum number of response body characters kept in a status error.
pub const BODY_SNIPPET_LIMIT: usize = 500;

/// Errors that can occur while talking to the Canvas REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (DNS, connection refused, reset, TLS).
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The request URL.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not complete within the metadata timeout.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The request URL.
        url: String,
    },

    /// HTTP 429; the client already slept for `retry_after`.
    #[error("rate limited requesting {url} (waited {}ms)", retry_after.as_millis())]
    RateLimited {
        /// The request URL.
        url: String,
        /// The delay honoured before surfacing this error.
        retry_after: Duration,
    },

    /// Any other HTTP error response.
    #[error("HTTP {status}: {body}")]
    Status {
        /// The request URL.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Response body truncated to [`BODY_SNIPPET_LIMIT`] characters.
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response body from {url}: {source}")]
    Decode {
        /// The request URL.
        url: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The base URL or a pagination link could not be parsed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL string.
        url: String,
    },
}

impl ApiError {
    /// Creates a transport error, folding reqwest timeouts into [`ApiError::Timeout`].
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates a status error, truncating the body snippet.
    pub fn status(url: impl Into<String>, status: u16, body: &str) -> Self {
        Self::Status {
            url: url.into(),
            status,
            body: body.chars().take(BODY_SNIPPET_LIMIT).collect(),
        }
    }

    /// Creates a rate-limit error.
    pub fn rate_limited(url: impl Into<String>, retry_after: Duration) -> Self {
        Self::RateLimited {
            url: url.into(),
            retry_after,
        }
    }

    /// Creates a decode error.
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns the HTTP status code, if this error carries one.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}

/// Classifies an API error for the retry policy.
///
/// Transport failures, timeouts, 429 and 5xx responses are retried; other
/// HTTP errors and malformed payloads are terminal.
#[must_use]
pub fn classify_api_error(error: &ApiError) -> FailureType {
    match error {
        ApiError::Network { source, .. } => crate::download::classify_transport(source),
        ApiError::Timeout { .. } => FailureType::Transient,
        ApiError::RateLimited { .. } => FailureType::RateLimited,
        ApiError::Status { status, .. } => crate::download::classify_http_status(*status),
        ApiError::Decode { .. } | ApiError::InvalidUrl { .. } => FailureType::Permanent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_truncates_body() {
        let body = "x".repeat(2_000);
        let error = ApiError::status("https://canvas.test/api/v1/files/1", 404, &body);
        match &error {
            ApiError::Status { body, status, .. } => {
                assert_eq!(*status, 404);
                assert_eq!(body.chars().count(), BODY_SNIPPET_LIMIT);
            }
            other => panic!("expected Status, got {other:?}"),
        }
        assert!(error.to_string().starts_with("HTTP 404: "));
    }

    #[test]
    fn test_status_error_truncates_on_char_boundary() {
        let body = "é".repeat(600);
        let error = ApiError::status("u", 500, &body);
        if let ApiError::Status { body, .. } = error {
            assert_eq!(body.chars().count(), BODY_SNIPPET_LIMIT);
        }
    }

    #[test]
    fn test_classify_api_errors() {
        assert_eq!(
            classify_api_error(&ApiError::status("u", 503, "")),
            FailureType::Transient
        );
        assert_eq!(
            classify_api_error(&ApiError::status("u", 404, "")),
            FailureType::Permanent
        );
        assert_eq!(
            classify_api_error(&ApiError::status("u", 401, "")),
            FailureType::NeedsAuth
        );
        assert_eq!(
            classify_api_error(&ApiError::rate_limited("u", Duration::from_secs(1))),
            FailureType::RateLimited
        );
        assert_eq!(
            classify_api_error(&ApiError::Timeout { url: "u".into() }),
            FailureType::Transient
        );
        assert_eq!(
            classify_api_error(&ApiError::invalid_url("::")),
            FailureType::Permanent
        );
    }

    #[test]
    fn test_status_code_accessor() {
        assert_eq!(ApiError::status("u", 418, "").status_code(), Some(418));
        assert_eq!(
            ApiError::rate_limited("u", Duration::ZERO).status_code(),
            Some(429)
        );
        assert_eq!(ApiError::invalid_url("u").status_code(), None);
    }
}
