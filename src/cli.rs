//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use canvas_dl_core::{DEFAULT_API_URL, MergeScope};

/// Download Canvas course module files and merge course PDFs.
#[derive(Parser, Debug)]
#[command(name = "canvas-dl")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show version
    Version,
    /// Read an access token from stdin and save it to the config file
    Auth(AuthArgs),
    /// List your courses
    Courses(CoursesArgs),
    /// Download module files for a course
    Download(DownloadArgs),
}

/// Arguments for `auth`.
#[derive(Args, Debug)]
pub struct AuthArgs {
    /// Canvas API base URL
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,
}

/// Arguments for `courses`.
#[derive(Args, Debug)]
pub struct CoursesArgs {
    /// Canvas API base URL override
    #[arg(long)]
    pub api_url: Option<String>,

    /// Access token override
    #[arg(long)]
    pub token: Option<String>,

    /// Only show published courses
    #[arg(long)]
    pub published: bool,
}

/// Arguments for `download`.
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Course ID to download (prompts for a course when omitted)
    #[arg(long)]
    pub course_id: Option<u64>,

    /// Canvas API base URL override
    #[arg(long)]
    pub api_url: Option<String>,

    /// Access token override
    #[arg(long)]
    pub token: Option<String>,

    /// Destination directory (default: ./downloads)
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Only download these file types, comma-separated (e.g. pdf,ipynb)
    #[arg(long)]
    pub only: Option<String>,

    /// Filter by file name (shell glob)
    #[arg(long)]
    pub name: Option<String>,

    /// Filter by file name (regex, matched anywhere in the name)
    #[arg(long)]
    pub regex: Option<String>,

    /// Concurrent downloads (1-100)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=100))]
    pub concurrency: Option<u16>,

    /// Skip PDF merging
    #[arg(long)]
    pub no_merge: bool,

    /// PDF merge scope: per-module, course, both or none
    #[arg(long, default_value_t = MergeScope::Both)]
    pub merge_scope: MergeScope,
}

impl DownloadArgs {
    /// Extensions from `--only`, trimmed, blanks dropped.
    #[must_use]
    pub fn only_extensions(&self) -> Option<Vec<String>> {
        self.only.as_ref().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|ext| !ext.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    /// Merge scope after applying `--no-merge`.
    #[must_use]
    pub fn effective_merge_scope(&self) -> MergeScope {
        if self.no_merge {
            MergeScope::None
        } else {
            self.merge_scope
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn download_args(argv: &[&str]) -> DownloadArgs {
        let mut full = vec!["canvas-dl", "download"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Download(args) => args,
            other => panic!("expected download, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let cli = Cli::try_parse_from(["canvas-dl", "-vv", "version"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let cli = Cli::try_parse_from(["canvas-dl", "version", "--verbose"]).unwrap();
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_cli_quiet_flag_is_global() {
        let cli = Cli::try_parse_from(["canvas-dl", "courses", "-q"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["canvas-dl"]).is_err());
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Cli::try_parse_from(["canvas-dl", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_auth_api_url_default() {
        let cli = Cli::try_parse_from(["canvas-dl", "auth"]).unwrap();
        match cli.command {
            Command::Auth(args) => assert_eq!(args.api_url, DEFAULT_API_URL),
            other => panic!("expected auth, got {other:?}"),
        }
    }

    #[test]
    fn test_courses_published_flag() {
        let cli = Cli::try_parse_from(["canvas-dl", "courses", "--published"]).unwrap();
        match cli.command {
            Command::Courses(args) => assert!(args.published),
            other => panic!("expected courses, got {other:?}"),
        }
    }

    #[test]
    fn test_download_defaults() {
        let args = download_args(&[]);
        assert!(args.course_id.is_none());
        assert!(args.concurrency.is_none());
        assert_eq!(args.merge_scope, MergeScope::Both);
        assert_eq!(args.effective_merge_scope(), MergeScope::Both);
        assert!(args.only_extensions().is_none());
    }

    #[test]
    fn test_download_filters_and_scope() {
        let args = download_args(&[
            "--course-id",
            "42",
            "--only",
            "pdf, ipynb,,",
            "--name",
            "Week*",
            "--regex",
            "lecture",
            "--merge-scope",
            "per-module",
        ]);
        assert_eq!(args.course_id, Some(42));
        assert_eq!(
            args.only_extensions().unwrap(),
            vec!["pdf".to_string(), "ipynb".to_string()]
        );
        assert_eq!(args.name.as_deref(), Some("Week*"));
        assert_eq!(args.merge_scope, MergeScope::PerModule);
    }

    #[test]
    fn test_download_no_merge_overrides_scope() {
        let args = download_args(&["--no-merge", "--merge-scope", "course"]);
        assert_eq!(args.effective_merge_scope(), MergeScope::None);
    }

    #[test]
    fn test_download_concurrency_range() {
        assert_eq!(download_args(&["--concurrency", "100"]).concurrency, Some(100));
        for bad in ["0", "101"] {
            let err = Cli::try_parse_from(["canvas-dl", "download", "--concurrency", bad])
                .unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn test_download_rejects_unknown_merge_scope() {
        let err = Cli::try_parse_from(["canvas-dl", "download", "--merge-scope", "all"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
