//! canvas-dl Core Library
//!
//! This library provides the core functionality for the canvas-dl tool,
//! which mirrors the files attached to a Canvas course's modules into a local
//! directory tree and concatenates the downloaded PDFs.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`api`] - Authenticated, paginated Canvas REST client
//! - [`download`] - File filtering, incremental state and the concurrent download pipeline
//! - [`merge`] - Order-preserving PDF concatenation per module or per course
//! - [`config`] - Explicit application configuration resolved from env, `.env` and config file
//! - [`cache`] - Small on-disk TTL cache for course listings

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod cache;
pub mod config;
pub mod download;
pub mod merge;
#[cfg(test)]
pub mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use api::{
    ApiError, CanvasClient, Course, CourseFilter, FileInfo, Module, ModuleItem, parse_link_header,
};
pub use cache::CourseCache;
pub use config::{AppConfig, ConfigError, DEFAULT_API_URL, mask_token};
pub use download::{
    CourseSync, DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, DownloadError, DownloadState,
    FailedDownload, FailureType, FileFilter, FilterError, HttpClient, NoopProgress, ProgressObserver,
    RetryDecision, RetryPolicy, SyncError, SyncReport, TransferProgress, classify_error,
    course_dir_name, sanitize_filename,
};
pub use merge::{MergeError, MergeScope, merge_course, merge_pdfs, merge_per_module, run_merges};
