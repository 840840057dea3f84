//! Course synchronisation: module discovery, filtering, incremental state and
//! bounded-concurrency downloads.
//!
//! # Flow
//!
//! 1. List modules (items embedded); modules without embedded items are
//!    completed with a per-module item listing.
//! 2. Resolve file metadata for every `File` item, one request at a time.
//! 3. Drop files rejected by the [`FileFilter`] and files whose state entry
//!    is current.
//! 4. Download the rest, at most `concurrency` at once.
//! 5. Persist the state, including every success, even when some downloads
//!    failed. A state that cannot be written is logged, not fatal.
//!
//! Any API error during discovery aborts the run before anything is written.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::client::HttpClient;
use super::error::DownloadError;
use super::filter::FileFilter;
use super::progress::{NoopProgress, ProgressObserver};
use super::retry::{RetryPolicy, classify_error};
use super::state::{DownloadState, STATE_FILE_NAME};
use crate::api::{ApiError, CanvasClient, Module};

/// Default number of concurrent file downloads.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Upper bound accepted for the concurrency setting.
pub const MAX_CONCURRENCY: usize = 100;

/// Errors that end a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Module or file discovery failed; nothing was downloaded.
    #[error("Canvas API error: {0}")]
    Api(#[from] ApiError),

    /// The course directory could not be created.
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Concurrency outside `1..=100`.
    #[error("invalid concurrency {0}: expected 1-{MAX_CONCURRENCY}")]
    InvalidConcurrency(usize),

    /// Some downloads failed; successes were kept and recorded.
    #[error("{} of {} file downloads failed", failures.len(), failures.len() + report.downloaded.len())]
    Downloads {
        /// One entry per failed file.
        failures: Vec<FailedDownload>,
        /// Outcome of the run, successes included.
        report: Box<SyncReport>,
    },
}

impl SyncError {
    fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// A file whose download failed after retries.
#[derive(Debug)]
pub struct FailedDownload {
    /// Canvas file id.
    pub file_id: u64,
    /// Destination the file would have been written to.
    pub path: PathBuf,
    /// Error of the last attempt.
    pub error: DownloadError,
}

/// Outcome of a sync run.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Files written during this run, in completion order.
    pub downloaded: Vec<PathBuf>,
    /// Files skipped because the state says they are current.
    pub skipped_unchanged: usize,
    /// Files rejected by the name filter.
    pub filtered_out: usize,
    /// File items without a content id or download URL.
    pub unavailable: usize,
    /// Every module of the course, items populated.
    pub modules: Vec<Module>,
}

#[derive(Debug)]
struct PendingDownload {
    file_id: u64,
    label: String,
    url: String,
    dest: PathBuf,
    size: Option<u64>,
    updated_at: Option<String>,
}

/// Synchronises one course's module files into a local directory.
pub struct CourseSync {
    api: CanvasClient,
    http: HttpClient,
    retry_policy: RetryPolicy,
    concurrency: usize,
    progress: Arc<dyn ProgressObserver>,
}

impl CourseSync {
    /// Creates a coordinator downloading at most `concurrency` files at once.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConcurrency`] outside `1..=100`.
    pub fn new(api: CanvasClient, http: HttpClient, concurrency: usize) -> Result<Self, SyncError> {
        if !(1..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(SyncError::InvalidConcurrency(concurrency));
        }
        Ok(Self {
            api,
            http,
            retry_policy: RetryPolicy::default(),
            concurrency,
            progress: Arc::new(NoopProgress),
        })
    }

    /// Replaces the retry policy applied to each file download.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Installs a progress observer.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    /// Configured concurrency.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs a sync of `course_id` into `course_dir`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Api`] when discovery fails (no files are touched)
    /// - [`SyncError::Filesystem`] when the course directory cannot be created
    /// - [`SyncError::Downloads`] when at least one file failed; the state still
    ///   records the files that succeeded
    #[instrument(skip(self, filter), fields(course_dir = %course_dir.display()))]
    pub async fn run(
        &self,
        course_id: u64,
        course_dir: &Path,
        filter: &FileFilter,
    ) -> Result<SyncReport, SyncError> {
        let modules = self.discover_modules(course_id).await?;

        std::fs::create_dir_all(course_dir)
            .map_err(|e| SyncError::filesystem(course_dir, e))?;
        let state_path = course_dir.join(STATE_FILE_NAME);
        let mut state = DownloadState::load(&state_path);

        let mut report = SyncReport::default();
        let pending = self
            .plan_downloads(course_dir, &modules, filter, &state, &mut report)
            .await?;
        info!(
            to_download = pending.len(),
            unchanged = report.skipped_unchanged,
            filtered = report.filtered_out,
            "download plan ready"
        );

        let failures = self.download_all(pending, &mut state, &mut report).await;

        if let Err(e) = state.save(&state_path) {
            warn!(
                path = %state_path.display(),
                error = %e,
                "failed to save download state, unchanged files will be fetched again next run"
            );
        }
        report.modules = modules;

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(SyncError::Downloads {
                failures,
                report: Box::new(report),
            })
        }
    }

    async fn discover_modules(&self, course_id: u64) -> Result<Vec<Module>, ApiError> {
        let mut modules = self.api.list_modules(course_id).await?;
        for module in &mut modules {
            if module.items.is_none() {
                debug!(module_id = module.id, "module items not embedded, listing separately");
                module.items = Some(self.api.list_module_items(course_id, module.id).await?);
            }
        }
        debug!(modules = modules.len(), "modules discovered");
        Ok(modules)
    }

    async fn plan_downloads(
        &self,
        course_dir: &Path,
        modules: &[Module],
        filter: &FileFilter,
        state: &DownloadState,
        report: &mut SyncReport,
    ) -> Result<Vec<PendingDownload>, ApiError> {
        let mut pending = Vec::new();
        let mut claimed: HashMap<PathBuf, u64> = HashMap::new();

        for module in modules {
            let module_dir = course_dir.join(module.dir_name());
            for item in module.items().iter().filter(|item| item.is_file()) {
                let Some(content_id) = item.content_id else {
                    warn!(item_id = item.id, "file item without content id, skipping");
                    report.unavailable += 1;
                    continue;
                };
                let info = self.api.get_file_info(content_id).await?;
                let name = info.file_name();

                if !filter.should_include(&name) {
                    debug!(file = %name, "excluded by filter");
                    report.filtered_out += 1;
                    continue;
                }

                let plain = module_dir.join(&name);
                let dest = match claimed.get(&plain) {
                    None => plain,
                    Some(&owner) if owner == info.id => {
                        debug!(file_id = info.id, "file listed twice in one module");
                        continue;
                    }
                    Some(_) => module_dir.join(with_id_suffix(&name, info.id)),
                };
                if claimed.insert(dest.clone(), info.id).is_some() {
                    debug!(file_id = info.id, "file listed twice in one module");
                    continue;
                }

                if state.is_current(info.id, info.updated_at.as_deref(), &dest) {
                    debug!(file = %name, "unchanged since last run");
                    report.skipped_unchanged += 1;
                    continue;
                }

                let Some(url) = info.url.clone() else {
                    warn!(file_id = info.id, file = %name, "file has no download URL, skipping");
                    report.unavailable += 1;
                    continue;
                };

                pending.push(PendingDownload {
                    file_id: info.id,
                    label: name,
                    url,
                    dest,
                    size: info.size,
                    updated_at: info.updated_at,
                });
            }
        }

        Ok(pending)
    }

    async fn download_all(
        &self,
        pending: Vec<PendingDownload>,
        state: &mut DownloadState,
        report: &mut SyncReport,
    ) -> Vec<FailedDownload> {
        let semaphore = Semaphore::new(self.concurrency);
        let semaphore = &semaphore;
        let mut in_flight: FuturesUnordered<_> = pending
            .into_iter()
            .map(|job| async move {
                let _permit = semaphore.acquire().await.ok();
                let result = self.fetch(&job).await;
                (job, result)
            })
            .collect();

        let mut failures = Vec::new();
        while let Some((job, result)) = in_flight.next().await {
            match result {
                Ok(bytes) => {
                    debug!(file = %job.label, bytes, "downloaded");
                    state.record(job.file_id, job.updated_at.as_deref(), &job.dest);
                    report.downloaded.push(job.dest);
                }
                Err(error) => {
                    warn!(file = %job.label, error = %error, "download failed");
                    failures.push(FailedDownload {
                        file_id: job.file_id,
                        path: job.dest,
                        error,
                    });
                }
            }
        }
        failures
    }

    async fn fetch(&self, job: &PendingDownload) -> Result<u64, DownloadError> {
        let progress = self.progress.start(&job.label, job.size);
        let handle = progress.as_ref();
        let result = self
            .retry_policy
            .run(classify_error, |_attempt| async move {
                handle.restart();
                self.http
                    .download_file(&job.url, &job.dest, job.size, handle)
                    .await
            })
            .await;
        progress.finish(result.is_ok());
        result
    }
}

/// `name` with `_<id>` inserted before the extension, for same-named files in one module.
fn with_id_suffix(name: &str, id: u64) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{id}.{ext}"),
        _ => format!("{name}_{id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_id_suffix() {
        assert_eq!(with_id_suffix("slides.pdf", 9), "slides_9.pdf");
        assert_eq!(with_id_suffix("README", 9), "README_9");
        assert_eq!(with_id_suffix(".hidden", 9), ".hidden_9");
    }
}
