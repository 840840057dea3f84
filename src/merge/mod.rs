//! Order-preserving PDF concatenation for a synced course.
//!
//! Two outputs exist, both written into the course directory:
//!
//! - `<module>.merged.pdf`: every PDF directly inside the module directory,
//!   in lexicographic order
//! - `course.merged.pdf`: PDFs of all modules, ordered by module then by
//!   module item, matching item titles against file names
//!
//! Title matching is a best-effort heuristic: a module where no item title
//! matches any file falls back to lexicographic order.

mod pdf;

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info};

use crate::api::Module;
use crate::download::sanitize_filename;

pub use pdf::merge_pdfs;

/// File name of the whole-course merge output.
pub const COURSE_MERGE_FILE: &str = "course.merged.pdf";

/// Suffix of per-module merge outputs.
pub const MODULE_MERGE_SUFFIX: &str = ".merged.pdf";

/// Errors writing merge outputs.
///
/// Unreadable inputs are never errors; they are logged and skipped.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Reading a module directory or writing an output failed.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Which merge outputs to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeScope {
    /// One merged PDF per module.
    PerModule,
    /// One merged PDF for the whole course.
    Course,
    /// Both of the above.
    #[default]
    Both,
    /// No merging.
    None,
}

impl MergeScope {
    /// True when per-module outputs are produced.
    #[must_use]
    pub fn per_module(self) -> bool {
        matches!(self, Self::PerModule | Self::Both)
    }

    /// True when the course output is produced.
    #[must_use]
    pub fn course(self) -> bool {
        matches!(self, Self::Course | Self::Both)
    }
}

impl FromStr for MergeScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-module" | "per_module" | "module" => Ok(Self::PerModule),
            "course" => Ok(Self::Course),
            "both" => Ok(Self::Both),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown merge scope '{other}' (expected per-module, course, both or none)"
            )),
        }
    }
}

impl fmt::Display for MergeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PerModule => "per-module",
            Self::Course => "course",
            Self::Both => "both",
            Self::None => "none",
        })
    }
}

/// Writes `<course_dir>/<module>.merged.pdf` for every module directory
/// holding at least one readable PDF. Returns the outputs written.
///
/// A module named `course` writes `course (module <id>).merged.pdf` instead.
///
/// Modules are processed in `(position, name)` order; missing module
/// directories are skipped.
///
/// # Errors
///
/// Returns [`MergeError`] when a module directory cannot be listed or an
/// output cannot be written.
pub fn merge_per_module(course_dir: &Path, modules: &[Module]) -> Result<Vec<PathBuf>, MergeError> {
    let mut outputs = Vec::new();
    for module in sorted_modules(modules) {
        let dir_name = module.dir_name();
        let module_dir = course_dir.join(&dir_name);
        if !module_dir.is_dir() {
            debug!(module = %dir_name, "module directory missing, skipping");
            continue;
        }
        let pdfs = list_pdfs(&module_dir)?;
        if pdfs.is_empty() {
            continue;
        }
        let output = course_dir.join(module_merge_name(&dir_name, module.id));
        if merge_pdfs(&pdfs, &output)? > 0 {
            info!(output = %output.display(), "module PDFs merged");
            outputs.push(output);
        }
    }
    Ok(outputs)
}

/// Per-module output name. A module directory named like the course-wide
/// output gets its id appended so the two never overwrite each other.
fn module_merge_name(dir_name: &str, module_id: u64) -> String {
    let name = format!("{dir_name}{MODULE_MERGE_SUFFIX}");
    if name.eq_ignore_ascii_case(COURSE_MERGE_FILE) {
        format!("{dir_name} (module {module_id}){MODULE_MERGE_SUFFIX}")
    } else {
        name
    }
}

/// Writes `<course_dir>/course.merged.pdf` in module then item order.
///
/// For each item (sorted by `(position, title)`) the first not-yet-used PDF
/// whose name starts with the item title, or contains it case-insensitively,
/// is appended. A module where no item matched contributes all its PDFs in
/// lexicographic order. Returns `None` when nothing was written.
///
/// # Errors
///
/// Returns [`MergeError`] when a module directory cannot be listed or the
/// output cannot be written.
pub fn merge_course(course_dir: &Path, modules: &[Module]) -> Result<Option<PathBuf>, MergeError> {
    let mut ordered = Vec::new();
    for module in sorted_modules(modules) {
        let module_dir = course_dir.join(module.dir_name());
        if !module_dir.is_dir() {
            continue;
        }
        let candidates = list_pdfs(&module_dir)?;
        let matched = order_by_items(module, &candidates);
        if matched.is_empty() {
            ordered.extend(candidates);
        } else {
            ordered.extend(matched);
        }
    }

    if ordered.is_empty() {
        return Ok(None);
    }
    let output = course_dir.join(COURSE_MERGE_FILE);
    if merge_pdfs(&ordered, &output)? > 0 {
        info!(output = %output.display(), files = ordered.len(), "course PDFs merged");
        Ok(Some(output))
    } else {
        Ok(None)
    }
}

/// Runs the merges selected by `scope`, returning every output written.
///
/// # Errors
///
/// Propagates the first [`MergeError`].
pub fn run_merges(
    course_dir: &Path,
    modules: &[Module],
    scope: MergeScope,
) -> Result<Vec<PathBuf>, MergeError> {
    let mut outputs = Vec::new();
    if scope.per_module() {
        outputs.extend(merge_per_module(course_dir, modules)?);
    }
    if scope.course() {
        outputs.extend(merge_course(course_dir, modules)?);
    }
    Ok(outputs)
}

fn sorted_modules(modules: &[Module]) -> Vec<&Module> {
    let mut sorted: Vec<&Module> = modules.iter().collect();
    sorted.sort_by(|a, b| a.merge_order(b));
    sorted
}

fn order_by_items(module: &Module, candidates: &[PathBuf]) -> Vec<PathBuf> {
    let mut items: Vec<_> = module.items().iter().collect();
    items.sort_by(|a, b| a.merge_order(b));

    let mut used = HashSet::new();
    let mut ordered = Vec::new();
    for item in items {
        let Some(title) = item.title.as_deref().filter(|t| !t.trim().is_empty()) else {
            continue;
        };
        let sanitized = sanitize_filename(title);
        let found = candidates.iter().enumerate().find(|(index, path)| {
            !used.contains(index)
                && file_name(path).is_some_and(|name| {
                    title_matches(name, title) || title_matches(name, &sanitized)
                })
        });
        if let Some((index, path)) = found {
            used.insert(index);
            ordered.push(path.clone());
        }
    }
    ordered
}

fn title_matches(file_name: &str, title: &str) -> bool {
    !title.is_empty()
        && (file_name.starts_with(title) || file_name.to_lowercase().contains(&title.to_lowercase()))
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// Regular files directly inside `dir` with a `.pdf` extension, sorted by name.
fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, MergeError> {
    let entries = std::fs::read_dir(dir).map_err(|e| MergeError::io(dir, e))?;
    let mut pdfs = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| MergeError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "pdf") {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs)
}
