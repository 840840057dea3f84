//! CLI command handlers.

mod auth;
mod courses;
mod download;

use anyhow::{Result, bail};
use canvas_dl_core::{AppConfig, CanvasClient, mask_token};
use tracing::debug;

pub use auth::run_auth_command;
pub use courses::run_courses_command;
pub use download::run_download_command;

/// Prints the binary name and version.
pub fn run_version_command() {
    println!("canvas-dl {}", env!("CARGO_PKG_VERSION"));
}

/// Builds an API client from flag overrides and the resolved configuration.
fn api_client(
    config: &AppConfig,
    api_url: Option<&str>,
    token: Option<&str>,
) -> Result<CanvasClient> {
    let api_url = api_url.unwrap_or(&config.api_url);
    let Some(token) = token
        .map(str::to_string)
        .or_else(|| config.access_token.clone())
        .filter(|token| !token.trim().is_empty())
    else {
        bail!("Missing access token. Run 'canvas-dl auth' or set ACCESS_TOKEN/.env.");
    };
    debug!(api_url, token = %mask_token(&token), "creating API client");
    Ok(CanvasClient::new(api_url, token)?)
}
