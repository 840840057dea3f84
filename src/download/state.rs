//! Incremental download state persisted next to the course files.
//!
//! The state maps a Canvas file id to the `updated_at` stamp and local path
//! seen when the file was last downloaded. It lives in
//! `<course_dir>/.state.json`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// File name of the state file inside a course directory.
pub const STATE_FILE_NAME: &str = ".state.json";

/// One downloaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Server-side modification stamp at download time.
    pub updated_at: String,
    /// Local destination the file was written to.
    pub path: String,
}

/// Map of file id to [`StateEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadState {
    entries: BTreeMap<String, StateEntry>,
}

impl DownloadState {
    /// Loads the state file at `path`.
    ///
    /// A missing file yields an empty state. An unreadable or corrupt file is
    /// logged and also treated as empty, so the next run re-downloads.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no state file yet");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read state file, starting fresh");
                return Self::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt state file, starting fresh");
                Self::default()
            }
        }
    }

    /// Writes the state as pretty JSON, via a temporary sibling and a rename.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when the directory cannot be created
    /// or the file cannot be written.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        debug!(path = %path.display(), entries = self.entries.len(), "state saved");
        Ok(())
    }

    /// True when `file_id` was downloaded at exactly `updated_at` and `dest` still exists.
    ///
    /// A file without a server stamp is never current.
    #[must_use]
    pub fn is_current(&self, file_id: u64, updated_at: Option<&str>, dest: &Path) -> bool {
        let Some(updated_at) = updated_at else {
            return false;
        };
        self.entries
            .get(&file_id.to_string())
            .is_some_and(|entry| entry.updated_at == updated_at && dest.exists())
    }

    /// Records a successful download.
    pub fn record(&mut self, file_id: u64, updated_at: Option<&str>, dest: &Path) {
        self.entries.insert(
            file_id.to_string(),
            StateEntry {
                updated_at: updated_at.unwrap_or_default().to_string(),
                path: dest.display().to_string(),
            },
        );
    }

    /// Entry for `file_id`, if any.
    #[must_use]
    pub fn get(&self, file_id: u64) -> Option<&StateEntry> {
        self.entries.get(&file_id.to_string())
    }

    /// Number of tracked files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no file is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
