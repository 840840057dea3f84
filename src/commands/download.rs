//! Download command handler: sync a course's module files, then merge PDFs.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use canvas_dl_core::{
    AppConfig, CanvasClient, CourseSync, FileFilter, HttpClient, MergeScope, Module, SyncError,
    SyncReport, course_dir_name, run_merges,
};
use tracing::{error, info, warn};

use super::courses::fetch_courses;
use crate::app::exit_handler::{ProcessExit, determine_exit_outcome};
use crate::app::progress_manager::progress_observer;
use crate::app::terminal::{is_dumb_terminal, pick_course, should_show_progress};
use crate::cli::DownloadArgs;

const DEFAULT_DEST: &str = "downloads";

pub async fn run_download_command(
    config: &AppConfig,
    args: DownloadArgs,
    quiet: bool,
) -> Result<ProcessExit> {
    let client = super::api_client(config, args.api_url.as_deref(), args.token.as_deref())?;

    let Some((course_id, course_name)) = resolve_course(&client, args.course_id).await? else {
        return Ok(ProcessExit::Failure);
    };

    let dest = args.dest.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_DEST));
    let course_dir = std::path::absolute(dest.join(course_dir_name(&course_name, course_id)))
        .context("Failed to resolve destination directory")?;

    let filter = FileFilter::new(
        args.only_extensions(),
        args.name.as_deref(),
        args.regex.as_deref(),
    )?;
    let concurrency = args.concurrency.map_or(config.concurrency, usize::from);
    let show_progress = should_show_progress(io::stderr().is_terminal(), quiet, is_dumb_terminal());

    let http = HttpClient::new().context("Failed to build HTTP client")?;
    let sync = CourseSync::new(client, http, concurrency)?
        .with_progress(progress_observer(show_progress));

    info!(
        course_id,
        course = %course_name,
        dest = %course_dir.display(),
        concurrency = sync.concurrency(),
        "Downloading course files"
    );

    let report = match sync.run(course_id, &course_dir, &filter).await {
        Ok(report) => report,
        Err(SyncError::Downloads { failures, report }) => {
            for failure in &failures {
                error!(
                    file_id = failure.file_id,
                    path = %failure.path.display(),
                    error = %failure.error,
                    "Download failed"
                );
            }
            log_report(&report);
            warn!("Skipping PDF merge because some downloads failed");
            return Ok(determine_exit_outcome(failures.len()));
        }
        Err(e) => return Err(e).context("Course sync failed"),
    };
    log_report(&report);

    let merged = merge_in_background(course_dir, report.modules, args.effective_merge_scope())
        .await?;
    for path in &merged {
        info!(path = %path.display(), "Merged PDF");
    }
    info!(
        downloaded = report.downloaded.len(),
        merged = merged.len(),
        "Done"
    );
    Ok(ProcessExit::Success)
}

/// Course id and name: given by flag, or picked from the published courses.
async fn resolve_course(
    client: &CanvasClient,
    course_id: Option<u64>,
) -> Result<Option<(u64, String)>> {
    if let Some(id) = course_id {
        let name = match fetch_courses(client, false).await {
            Ok(courses) => courses
                .iter()
                .find(|course| course.id == id)
                .and_then(|course| course.name.clone()),
            Err(e) => {
                warn!(error = %e, "Could not look up course name");
                None
            }
        };
        return Ok(Some((id, name.unwrap_or_else(|| format!("course-{id}")))));
    }

    let courses = fetch_courses(client, true).await?;
    if courses.is_empty() {
        error!("No published courses found");
        return Ok(None);
    }
    let picked = pick_course(&courses, io::stdin().lock(), io::stderr())
        .context("Failed to read course selection")?;
    match picked {
        Some(course) => Ok(Some((course.id, course.display_name()))),
        None => {
            error!("No course selected");
            Ok(None)
        }
    }
}

fn log_report(report: &SyncReport) {
    for path in &report.downloaded {
        info!(path = %path.display(), "Downloaded");
    }
    info!(
        downloaded = report.downloaded.len(),
        unchanged = report.skipped_unchanged,
        filtered = report.filtered_out,
        unavailable = report.unavailable,
        "Sync summary"
    );
}

async fn merge_in_background(
    course_dir: PathBuf,
    modules: Vec<Module>,
    scope: MergeScope,
) -> Result<Vec<PathBuf>> {
    if scope == MergeScope::None {
        return Ok(Vec::new());
    }
    tokio::task::spawn_blocking(move || run_merges(&course_dir, &modules, scope))
        .await
        .context("PDF merge task panicked")?
        .context("PDF merge failed")
}
