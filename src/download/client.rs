//! HTTP client for streaming course files to disk.
//!
//! File URLs handed out by Canvas are pre-signed, so no bearer token is
//! attached here. Bodies stream into a `<name>.part` sibling that is renamed
//! over the destination only after the last byte is flushed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, DOWNLOAD_TIMEOUT_SECS, PARTIAL_SUFFIX};
use super::error::DownloadError;
use super::progress::TransferProgress;
use super::rate_limit::rate_limit_delay;
use crate::user_agent;

/// HTTP client for file bodies.
///
/// Create once and clone freely; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default 60 second per-download timeout.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error when TLS initialisation fails.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
    }

    /// Creates a client with an explicit whole-request timeout.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error when TLS initialisation fails.
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }

    /// Downloads `url` to `dest`, streaming through `<dest>.part`.
    ///
    /// The parent directory is created when missing. On any failure the
    /// partial file is removed and `dest` is left untouched. A 429 waits for
    /// the server's `Retry-After` before returning, so a retry can follow
    /// straight away.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] for invalid URLs, transport failures,
    /// non-success statuses and filesystem errors.
    #[instrument(skip(self, progress), fields(url = %url, dest = %dest.display()))]
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        expected_size: Option<u64>,
        progress: &dyn TransferProgress,
    ) -> Result<u64, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let header = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok());
            let delay = rate_limit_delay(header);
            warn!(delay_ms = delay.as_millis(), "rate limited by file host");
            tokio::time::sleep(delay).await;
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        if let Some(total) = response.content_length().filter(|len| *len > 0).or(expected_size) {
            progress.set_total(total);
        }

        let partial = partial_path(dest);
        let result = stream_to_partial(response, url, &partial, progress).await;
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %partial.display(), "removing partial file after error");
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&partial, dest).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(DownloadError::io(dest, e));
        }

        debug!(bytes, "download complete");
        Ok(bytes)
    }
}

/// `<dest>.part`, next to the destination.
#[must_use]
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

async fn stream_to_partial(
    response: reqwest::Response,
    url: &str,
    partial: &Path,
    progress: &dyn TransferProgress,
) -> Result<u64, DownloadError> {
    let file = File::create(partial)
        .await
        .map_err(|e| DownloadError::io(partial, e))?;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(partial, e))?;
        bytes_written += chunk.len() as u64;
        progress.advance(chunk.len() as u64);
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(partial, e))?;

    Ok(bytes_written)
}

/// Builds the shared reqwest client: connect timeout, whole-request timeout,
/// gzip and the tool's User-Agent.
pub(crate) fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(timeout)
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
        .build()
}
