//! Course file downloads: filtering, incremental state, retries and
//! bounded-concurrency streaming to disk.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use canvas_dl_core::{CanvasClient, CourseSync, FileFilter, HttpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = CanvasClient::new("https://canvas.example.edu/api/v1", "token")?;
//! let sync = CourseSync::new(api, HttpClient::new()?, 3)?;
//! let filter = FileFilter::new(Some(vec!["pdf".into()]), None, None)?;
//! let report = sync.run(42, Path::new("./downloads/Course"), &filter).await?;
//! println!("downloaded {} files", report.downloaded.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod coordinator;
mod error;
mod filename;
mod filter;
mod progress;
mod rate_limit;
mod retry;
mod state;

pub use client::{HttpClient, partial_path};
pub(crate) use client::build_client;
pub use constants::{API_TIMEOUT_SECS, DOWNLOAD_TIMEOUT_SECS, MAX_FILENAME_CHARS};
pub use coordinator::{
    CourseSync, DEFAULT_CONCURRENCY, FailedDownload, MAX_CONCURRENCY, SyncError, SyncReport,
};
pub use error::DownloadError;
pub use filename::{course_dir_name, sanitize_filename, sanitize_filename_with_limit};
pub use filter::{FileFilter, FilterError};
pub use progress::{NoopProgress, ProgressObserver, TransferProgress};
pub use rate_limit::{parse_retry_after, rate_limit_delay};
pub use retry::{DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error};
pub(crate) use retry::{classify_http_status, classify_transport};
pub use state::{DownloadState, STATE_FILE_NAME, StateEntry};
