//! On-disk TTL cache for course listings.
//!
//! Listing courses is the slowest interactive call, so `courses` keeps the
//! result for five minutes. Entries are JSON files holding a Unix timestamp
//! and the cached courses; anything unreadable counts as a miss.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::Course;

/// Default time-to-live of a cached listing.
pub const DEFAULT_COURSE_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    /// Seconds since the Unix epoch when the entry was written.
    stored_at: f64,
    data: Vec<Course>,
}

/// TTL cache of course listings, one file per listing variant.
#[derive(Debug, Clone)]
pub struct CourseCache {
    dir: PathBuf,
    ttl: Duration,
}

impl CourseCache {
    /// Creates a cache storing its files in `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// Cache in the default cache directory with the default TTL, if a home
    /// directory is known.
    #[must_use]
    pub fn default_location() -> Option<Self> {
        crate::config::default_cache_dir().map(|dir| Self::new(dir, DEFAULT_COURSE_CACHE_TTL))
    }

    /// Path of the cache file for the given listing variant.
    #[must_use]
    pub fn path_for(&self, published_only: bool) -> PathBuf {
        let name = if published_only {
            "courses-published.json"
        } else {
            "courses.json"
        };
        self.dir.join(name)
    }

    /// Returns the cached courses when present and younger than the TTL.
    #[must_use]
    pub fn load(&self, published_only: bool) -> Option<Vec<Course>> {
        let path = self.path_for(published_only);
        let raw = std::fs::read_to_string(&path).ok()?;
        let envelope: CacheEnvelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "discarding unreadable course cache");
                return None;
            }
        };
        let age = now_secs() - envelope.stored_at;
        if !(0.0..=self.ttl.as_secs_f64()).contains(&age) {
            debug!(path = %path.display(), age_secs = age, "course cache expired");
            return None;
        }
        debug!(path = %path.display(), courses = envelope.data.len(), "course cache hit");
        Some(envelope.data)
    }

    /// Stores `courses`. Failures are logged and otherwise ignored.
    pub fn store(&self, published_only: bool, courses: &[Course]) {
        let path = self.path_for(published_only);
        if let Err(e) = write_envelope(&path, courses) {
            warn!(path = %path.display(), error = %e, "failed to write course cache");
        }
    }
}

fn write_envelope(path: &Path, courses: &[Course]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let envelope = CacheEnvelope {
        stored_at: now_secs(),
        data: courses.to_vec(),
    };
    let json = serde_json::to_string(&envelope).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}
