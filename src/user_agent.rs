//! Shared User-Agent string for API and file download clients.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/canvas-dl";

/// Default User-Agent for every request (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("canvas-dl/{version} (course-file-sync; +{PROJECT_UA_URL})")
}
