mod cli;
mod commands;
mod error;

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use stovelink_core::{Coordinator, StoveConfig};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = build_stove_config(&cli)?;
    let coordinator = Coordinator::new(config)?;

    tracing::debug!(command = ?cli.command, "dispatching command");
    commands::dispatch(cli.command, &coordinator).await
}

/// Build a `StoveConfig` from the config file and profile selection.
fn build_stove_config(cli: &Cli) -> Result<StoveConfig, CliError> {
    let cfg = stovelink_config::load_config()?;

    let (name, profile) = cfg
        .profile(cli.global.profile.as_deref())
        .map_err(|_| CliError::NoConfig {
            path: stovelink_config::config_path().display().to_string(),
        })?;

    let mut config = stovelink_config::profile_to_stove_config(profile, name)?;

    if let Command::Watch {
        interval: Some(secs),
    } = &cli.command
    {
        config.refresh_interval = Duration::from_secs(*secs);
    }

    Ok(config)
}
