//! Authenticated, paginated Canvas REST client.

use std::time::Duration;

use reqwest::header::{LINK, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::error::{ApiError, classify_api_error};
use super::link::parse_link_header;
use super::models::{Course, FileInfo, Module, ModuleItem};
use crate::download::{API_TIMEOUT_SECS, RetryPolicy, build_client, rate_limit_delay};

/// Page size requested from every list endpoint.
const PER_PAGE: &str = "100";

/// Optional constraints for [`CanvasClient::list_courses`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseFilter {
    /// Canvas `enrollment_state` (for example `active`).
    pub enrollment_state: Option<String>,
    /// Restrict to published (`true`) or unpublished (`false`) courses.
    pub published: Option<bool>,
}

impl CourseFilter {
    /// Filter matching published courses only.
    #[must_use]
    pub fn published() -> Self {
        Self {
            published: Some(true),
            ..Self::default()
        }
    }
}

/// Body and pagination link of one successful response.
struct ApiResponse {
    link: Option<String>,
    body: String,
}

/// Client for the Canvas REST API.
///
/// Every request carries `Authorization: Bearer <token>` and is retried
/// according to the configured [`RetryPolicy`].
#[derive(Clone)]
pub struct CanvasClient {
    client: Client,
    base_url: String,
    token: String,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for CanvasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasClient")
            .field("base_url", &self.base_url)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl CanvasClient {
    /// Creates a client for `base_url` (for example `https://canvas.uva.nl/api/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] when the base URL does not parse and
    /// [`ApiError::Network`] when the HTTP client cannot be built.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        match Url::parse(&base_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            _ => return Err(ApiError::invalid_url(base_url)),
        }
        let client = build_client(Duration::from_secs(API_TIMEOUT_SECS))
            .map_err(|e| ApiError::transport(&base_url, e))?;

        Ok(Self {
            client,
            base_url,
            token: token.into(),
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lists the courses visible to the token owner.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when a page request fails after retries or an
    /// element does not decode as a course.
    #[instrument(skip(self))]
    pub async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, ApiError> {
        let mut params = vec![("per_page", PER_PAGE.to_string())];
        if let Some(state) = &filter.enrollment_state {
            params.push(("enrollment_state", state.clone()));
        }
        if let Some(published) = filter.published {
            params.push(("published", published.to_string()));
        }
        self.paginate("/courses", &params).await
    }

    /// Lists a course's modules with their items embedded.
    ///
    /// # Errors
    ///
    /// See [`list_courses`](Self::list_courses).
    #[instrument(skip(self))]
    pub async fn list_modules(&self, course_id: u64) -> Result<Vec<Module>, ApiError> {
        let params = [
            ("per_page", PER_PAGE.to_string()),
            ("include[]", "items".to_string()),
        ];
        self.paginate(&format!("/courses/{course_id}/modules"), &params)
            .await
    }

    /// Lists the items of one module.
    ///
    /// # Errors
    ///
    /// See [`list_courses`](Self::list_courses).
    #[instrument(skip(self))]
    pub async fn list_module_items(
        &self,
        course_id: u64,
        module_id: u64,
    ) -> Result<Vec<ModuleItem>, ApiError> {
        let params = [("per_page", PER_PAGE.to_string())];
        self.paginate(
            &format!("/courses/{course_id}/modules/{module_id}/items"),
            &params,
        )
        .await
    }

    /// Fetches the metadata (including the pre-signed download URL) of one file.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the request fails after retries or the body
    /// is not a file object.
    #[instrument(skip(self))]
    pub async fn get_file_info(&self, file_id: u64) -> Result<FileInfo, ApiError> {
        let url = self.endpoint(&format!("/files/{file_id}"), &[])?;
        let response = self.get(&url).await?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::decode(url.as_str(), e))
    }

    /// Collects every page of a list endpoint by following `rel="next"` links.
    ///
    /// Query parameters are sent with the first request only; `next` links
    /// already carry them.
    async fn paginate<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        let mut next = Some(self.endpoint(path, params)?);
        let mut collected = Vec::new();
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            let response = self.get(&url).await?;
            pages += 1;

            let values = match serde_json::from_str::<Value>(&response.body) {
                Ok(Value::Array(values)) => values,
                Ok(value) => vec![value],
                Err(e) => {
                    warn!(url = %url, error = %e, "malformed JSON page, stopping pagination");
                    break;
                }
            };
            for value in values {
                collected.push(
                    serde_json::from_value(value).map_err(|e| ApiError::decode(url.as_str(), e))?,
                );
            }

            next = match parse_link_header(response.link.as_deref()).remove("next") {
                Some(link) => Some(Url::parse(&link).map_err(|_| ApiError::invalid_url(link))?),
                None => None,
            };
        }

        debug!(path, pages, items = collected.len(), "pagination complete");
        Ok(collected)
    }

    async fn get(&self, url: &Url) -> Result<ApiResponse, ApiError> {
        self.retry_policy
            .run(classify_api_error, |_attempt| self.send_once(url))
            .await
    }

    /// One GET attempt. A 429 sleeps for the server-mandated delay before
    /// returning [`ApiError::RateLimited`] so the retry loop can continue.
    async fn send_once(&self, url: &Url) -> Result<ApiResponse, ApiError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::transport(url.as_str(), e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let header = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok());
            let delay = rate_limit_delay(header);
            warn!(url = %url, delay_ms = delay.as_millis(), "rate limited by Canvas");
            tokio::time::sleep(delay).await;
            return Err(ApiError::rate_limited(url.as_str(), delay));
        }

        let link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::transport(url.as_str(), e))?;

        if !status.is_success() {
            return Err(ApiError::status(url.as_str(), status.as_u16(), &body));
        }
        Ok(ApiResponse { link, body })
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|_| ApiError::invalid_url(raw))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = CanvasClient::new("https://canvas.test/api/v1/", "t").unwrap();
        assert_eq!(client.base_url(), "https://canvas.test/api/v1");
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        assert!(matches!(
            CanvasClient::new("not a url", "t"),
            Err(ApiError::InvalidUrl { .. })
        ));
        assert!(matches!(
            CanvasClient::new("ftp://canvas.test", "t"),
            Err(ApiError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_endpoint_appends_query_only_when_present() {
        let client = CanvasClient::new("https://canvas.test/api/v1", "t").unwrap();
        let url = client.endpoint("/files/9", &[]).unwrap();
        assert_eq!(url.as_str(), "https://canvas.test/api/v1/files/9");

        let url = client
            .endpoint("/courses", &[("per_page", "100".to_string())])
            .unwrap();
        assert_eq!(url.as_str(), "https://canvas.test/api/v1/courses?per_page=100");
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let client = CanvasClient::new("https://canvas.test/api/v1", "super-secret").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("canvas.test"));
    }

    #[test]
    fn test_published_course_filter() {
        let filter = CourseFilter::published();
        assert_eq!(filter.published, Some(true));
        assert!(filter.enrollment_state.is_none());
    }
}
