//! Canvas REST API access.
//!
//! [`CanvasClient`] wraps a reqwest client with bearer authentication,
//! `Link`-header pagination and retries (exponential backoff with jitter,
//! Retry-After handling for HTTP 429).

mod client;
mod error;
mod link;
mod models;

pub use client::{CanvasClient, CourseFilter};
pub use error::{ApiError, BODY_SNIPPET_LIMIT, classify_api_error};
pub use link::parse_link_header;
pub use models::{Course, FILE_ITEM_TYPE, FileInfo, Module, ModuleItem, Term};
