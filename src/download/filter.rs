//! Name-based selection of course files.
//!
//! A [`FileFilter`] combines up to three constraints, all optional:
//! an extension allow-list, a shell glob and a regular expression.
//! Present constraints are ANDed; an empty filter accepts everything.

use regex::Regex;
use thiserror::Error;

/// Errors raised while building a [`FileFilter`].
#[derive(Debug, Error)]
pub enum FilterError {
    /// The `--name` glob could not be compiled.
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        /// The glob as given by the user.
        pattern: String,
        /// Compilation error of the translated pattern.
        #[source]
        source: regex::Error,
    },

    /// The `--regex` pattern could not be compiled.
    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex {
        /// The pattern as given by the user.
        pattern: String,
        /// Compilation error.
        #[source]
        source: regex::Error,
    },
}

/// Predicate over sanitized file names.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    only_exts: Vec<String>,
    name_glob: Option<Regex>,
    name_regex: Option<Regex>,
}

impl FileFilter {
    /// Builds a filter, compiling the glob and regex up front.
    ///
    /// Extensions are matched case-insensitively as a `.ext` suffix; a leading
    /// dot in the given extension is accepted and blank entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] when the glob or the regex does not compile.
    ///
    /// # Example
    ///
    /// ```
    /// use canvas_dl_core::FileFilter;
    ///
    /// let filter = FileFilter::new(Some(vec!["pdf".into()]), Some("Lecture*"), None).unwrap();
    /// assert!(filter.should_include("Lecture 1.PDF"));
    /// assert!(!filter.should_include("Lecture 1.docx"));
    /// assert!(!filter.should_include("Notes.pdf"));
    /// ```
    pub fn new(
        only_exts: Option<Vec<String>>,
        name_glob: Option<&str>,
        name_regex: Option<&str>,
    ) -> Result<Self, FilterError> {
        let only_exts = only_exts
            .unwrap_or_default()
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{ext}"))
            .collect();

        let name_glob = name_glob
            .map(|pattern| {
                Regex::new(&glob_to_regex(pattern)).map_err(|source| FilterError::InvalidGlob {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()?;

        let name_regex = name_regex
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| FilterError::InvalidRegex {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .transpose()?;

        Ok(Self {
            only_exts,
            name_glob,
            name_regex,
        })
    }

    /// Returns true when `filename` satisfies every configured constraint.
    #[must_use]
    pub fn should_include(&self, filename: &str) -> bool {
        if !self.only_exts.is_empty() {
            let lower = filename.to_lowercase();
            if !self.only_exts.iter().any(|ext| lower.ends_with(ext)) {
                return false;
            }
        }
        if let Some(glob) = &self.name_glob {
            if !glob.is_match(filename) {
                return false;
            }
        }
        if let Some(regex) = &self.name_regex {
            if !regex.is_match(filename) {
                return false;
            }
        }
        true
    }

    /// True when no constraint is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.only_exts.is_empty() && self.name_glob.is_none() && self.name_regex.is_none()
    }
}

/// Translates a shell glob (`*`, `?`, `[seq]`, `[!seq]`) into an anchored regex.
///
/// An unterminated `[` is taken literally.
fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::from("^(?s:");
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => {
                while chars.get(i) == Some(&'*') {
                    i += 1;
                }
                out.push_str(".*");
            }
            '?' => out.push('.'),
            '[' => {
                let mut j = i;
                if chars.get(j) == Some(&'!') {
                    j += 1;
                }
                if chars.get(j) == Some(&']') {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    out.push_str(r"\[");
                    continue;
                }

                let set = &chars[i..j];
                i = j + 1;
                out.push('[');
                let body = match set.first() {
                    Some('!') => {
                        out.push('^');
                        &set[1..]
                    }
                    _ => set,
                };
                for &member in body {
                    if member == '-' {
                        out.push('-');
                    } else {
                        out.push_str(&regex::escape(member.encode_utf8(&mut [0; 4])));
                    }
                }
                out.push(']');
            }
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }

    out.push_str(")$");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filter(exts: Option<&[&str]>, glob: Option<&str>, regex: Option<&str>) -> FileFilter {
        let exts = exts.map(|e| e.iter().map(ToString::to_string).collect());
        FileFilter::new(exts, glob, regex).unwrap()
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let f = FileFilter::default();
        assert!(f.is_empty());
        assert!(f.should_include("anything.bin"));
        assert!(f.should_include(""));
    }

    #[test]
    fn test_extension_match_is_case_insensitive_suffix() {
        let f = filter(Some(&["pdf", ".IPYNB"]), None, None);
        assert!(f.should_include("notes.PDF"));
        assert!(f.should_include("lab.ipynb"));
        assert!(!f.should_include("notes.pdf.zip"));
        assert!(!f.should_include("pdf"));
    }

    #[test]
    fn test_blank_extensions_are_ignored() {
        let f = filter(Some(&["", "  "]), None, None);
        assert!(f.is_empty());
        assert!(f.should_include("x.docx"));
    }

    #[test]
    fn test_glob_matches_whole_name_case_sensitively() {
        let f = filter(None, Some("Week?_*.pdf"), None);
        assert!(f.should_include("Week1_intro.pdf"));
        assert!(!f.should_include("week1_intro.pdf"));
        assert!(!f.should_include("Week1_intro.pdf.bak"));
        assert!(!f.should_include("Week10_intro.pdfx"));
    }

    #[test]
    fn test_glob_character_classes() {
        let f = filter(None, Some("lab[0-3].py"), None);
        assert!(f.should_include("lab2.py"));
        assert!(!f.should_include("lab7.py"));

        let f = filter(None, Some("lab[!0-3].py"), None);
        assert!(f.should_include("lab7.py"));
        assert!(!f.should_include("lab2.py"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let f = filter(None, Some("a+b (1).pdf"), None);
        assert!(f.should_include("a+b (1).pdf"));
        assert!(!f.should_include("aab (1)xpdf"));
    }

    #[test]
    fn test_glob_unterminated_bracket_is_literal() {
        let f = filter(None, Some("[draft"), None);
        assert!(f.should_include("[draft"));
        assert!(!f.should_include("d"));
    }

    #[test]
    fn test_glob_leading_bracket_member() {
        let f = filter(None, Some("x[]]"), None);
        assert!(f.should_include("x]"));
    }

    #[test]
    fn test_regex_uses_search_semantics() {
        let f = filter(None, None, Some(r"lecture\d+"));
        assert!(f.should_include("Intro lecture12 slides.pdf"));
        assert!(!f.should_include("Intro lecture slides.pdf"));
    }

    #[test]
    fn test_constraints_are_anded() {
        let f = filter(Some(&["pdf"]), Some("*slides*"), Some("^W"));
        assert!(f.should_include("Week 1 slides.pdf"));
        assert!(!f.should_include("Week 1 slides.pptx"));
        assert!(!f.should_include("Week 1 notes.pdf"));
        assert!(!f.should_include("week 1 slides.pdf"));
    }

    #[test]
    fn test_invalid_patterns_are_rejected() {
        assert!(matches!(
            FileFilter::new(None, None, Some("(unclosed")),
            Err(FilterError::InvalidRegex { .. })
        ));
        assert!(matches!(
            FileFilter::new(None, Some("[z-a]"), None),
            Err(FilterError::InvalidGlob { .. })
        ));
    }
}
