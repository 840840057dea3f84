//! Auth command handler: store an access token in the config file.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result, bail};
use canvas_dl_core::{AppConfig, mask_token};
use tracing::info;

use crate::app::terminal::read_secret;

pub fn run_auth_command(mut config: AppConfig, api_url: String) -> Result<()> {
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let token = read_secret(
        "Paste your Canvas access token: ",
        interactive,
        stdin.lock(),
        io::stderr(),
    )
    .context("Failed to read access token")?;
    let Some(token) = token else {
        bail!("No access token provided");
    };

    config.api_url = api_url;
    config.access_token = Some(token);
    let path = config.save().context("Failed to save configuration")?;

    info!(
        path = %path.display(),
        api_url = %config.api_url,
        token = %mask_token(config.access_token.as_deref().unwrap_or_default()),
        "Saved access token"
    );
    Ok(())
}
