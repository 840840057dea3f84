//! Deterministic filename sanitization for the course file tree.

use std::path::{Component, Path};

use super::constants::MAX_FILENAME_CHARS;

/// Sanitizes a raw Canvas name into a single safe path segment.
///
/// - control characters are removed
/// - `/` and `\` become `-`
/// - whitespace runs collapse to one space, ends are trimmed
/// - the result is truncated to [`MAX_FILENAME_CHARS`] characters, keeping
///   the extension when there is one
/// - `.` and `..` become `_`
///
/// The function is idempotent: `sanitize_filename(&sanitize_filename(x)) == sanitize_filename(x)`.
///
/// # Example
///
/// ```
/// use canvas_dl_core::sanitize_filename;
///
/// assert_eq!(sanitize_filename("  Week 1/Intro\t slides.pdf "), "Week 1-Intro slides.pdf");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    sanitize_filename_with_limit(name, MAX_FILENAME_CHARS)
}

/// [`sanitize_filename`] with an explicit character limit.
#[must_use]
pub fn sanitize_filename_with_limit(name: &str, max_chars: usize) -> String {
    let replaced: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '/' | '\\' => '-',
            c => c,
        })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated = truncate_keeping_extension(&collapsed, max_chars);

    if is_safe_filename_segment(&truncated) {
        truncated
    } else {
        truncated.replace('.', "_")
    }
}

/// Directory name for a course: a sanitized name without trailing spaces or dots.
///
/// Falls back to `course-<id>` when nothing usable remains.
#[must_use]
pub fn course_dir_name(name: &str, course_id: u64) -> String {
    let cleaned = sanitize_filename(name)
        .trim_end_matches([' ', '.'])
        .to_string();
    if cleaned.is_empty() {
        format!("course-{course_id}")
    } else {
        cleaned
    }
}

fn truncate_keeping_extension(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }

    if let Some((base, ext)) = name.rsplit_once('.') {
        let ext_chars = ext.chars().count();
        if ext_chars + 1 < max_chars {
            let keep = max_chars - ext_chars - 1;
            let base: String = base.chars().take(keep).collect();
            return format!("{}.{ext}", base.trim_end());
        }
    }

    name.chars()
        .take(max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}
