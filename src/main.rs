//! CLI entry point for canvas-dl.

use std::process::ExitCode;

use anyhow::Result;
use canvas_dl_core::AppConfig;
use clap::Parser;
use tracing::{debug, error};

mod app;
mod cli;
mod commands;

use app::exit_handler::ProcessExit;
use app::terminal::{default_log_level, init_tracing};
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();

    // Config errors are reported after tracing is up
    let config = AppConfig::load();
    let config_verbose = config.as_ref().is_ok_and(|config| config.verbose);
    init_tracing(default_log_level(cli.quiet, cli.verbose, config_verbose));
    debug!(?cli, "CLI arguments parsed");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ProcessExit::Failure.into();
        }
    };
    debug!(?config, "configuration resolved");

    match run(cli, config).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            error!("{e:#}");
            ProcessExit::Failure.into()
        }
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<ProcessExit> {
    match cli.command {
        Command::Version => {
            commands::run_version_command();
            Ok(ProcessExit::Success)
        }
        Command::Auth(args) => {
            commands::run_auth_command(config, args.api_url)?;
            Ok(ProcessExit::Success)
        }
        Command::Courses(args) => {
            commands::run_courses_command(&config, args).await?;
            Ok(ProcessExit::Success)
        }
        Command::Download(args) => {
            commands::run_download_command(&config, args, cli.quiet).await
        }
    }
}
