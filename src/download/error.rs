//! Failure of a single course-file transfer.

use std::path::PathBuf;

use thiserror::Error;

/// Why one file could not be fetched into the course tree.
///
/// Each variant carries the pre-signed file URL or the local path involved,
/// which is what the run summary reports per failed file.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The file host could not be reached or the body stream broke off.
    #[error("network error downloading {url}: {source}")]
    Network {
        /// Pre-signed file URL.
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The request or body stream exceeded the download timeout.
    #[error("timeout downloading {url}")]
    Timeout {
        /// Pre-signed file URL.
        url: String,
    },

    /// The file host answered with a non-success status (429 included).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// Pre-signed file URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// Creating the module directory, writing the `.part` file or renaming it failed.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// Directory, partial file or destination that failed.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Canvas returned a file URL that does not parse.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The URL as received.
        url: String,
    },
}

impl DownloadError {
    /// Transport failure; reqwest timeouts become [`DownloadError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::timeout(url);
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_file_involved() {
        let url = "https://files.canvas.test/files/5/download?verifier=abc";
        assert_eq!(
            DownloadError::http_status(url, 403).to_string(),
            format!("HTTP 403 downloading {url}")
        );

        let part = PathBuf::from("Week 1/Syllabus.pdf.part");
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(
            DownloadError::io(&part, denied)
                .to_string()
                .starts_with("IO error writing to Week 1/Syllabus.pdf.part")
        );
    }
}
