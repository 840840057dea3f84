//! Courses command handler: list the user's courses.

use anyhow::{Context, Result};
use canvas_dl_core::{AppConfig, CanvasClient, Course, CourseCache, CourseFilter};
use tracing::{debug, info};

use crate::app::terminal::render_course_table;
use crate::cli::CoursesArgs;

pub async fn run_courses_command(config: &AppConfig, args: CoursesArgs) -> Result<()> {
    let client = super::api_client(config, args.api_url.as_deref(), args.token.as_deref())?;
    let courses = fetch_courses(&client, args.published).await?;

    if courses.is_empty() {
        info!("No courses found");
        return Ok(());
    }
    print!("{}", render_course_table(&courses));
    Ok(())
}

/// Lists courses, served from the on-disk cache while it is fresh.
pub(crate) async fn fetch_courses(client: &CanvasClient, published_only: bool) -> Result<Vec<Course>> {
    let cache = CourseCache::default_location();
    if let Some(courses) = cache.as_ref().and_then(|cache| cache.load(published_only)) {
        debug!(courses = courses.len(), "using cached course list");
        return Ok(courses);
    }

    let filter = if published_only {
        CourseFilter::published()
    } else {
        CourseFilter::default()
    };
    let courses = client
        .list_courses(&filter)
        .await
        .context("Failed to list courses")?;

    if let Some(cache) = &cache {
        cache.store(published_only, &courses);
    }
    Ok(courses)
}
