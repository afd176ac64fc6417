//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, discovers configuration, initialises logging and
//! dispatches to a command. It prints every error itself and hands main.rs
//! only the exit code.

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;

use crate::{CliArgs, Config, ConfigError, ExitCode, ScratchError, UserFriendlyError};
use scratchrun_utils::logging::init_tracing;

/// Main CLI execution function.
///
/// Returns `Ok(())` on success and `Err(ExitCode)` after the error has been
/// printed.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        verbose: Some(cli.verbose),
        launch_program: match &cli.command {
            Commands::Run { java, .. } => java.clone(),
            _ => None,
        },
        timeout_secs: match &cli.command {
            Commands::Run { timeout, .. } => *timeout,
            _ => None,
        },
    };

    let config = Config::discover(&cli_args).map_err(|err| report_config_error(&err))?;

    if let Err(e) = init_tracing(config.verbose()) {
        eprintln!("warning: failed to initialise logging: {e}");
    }
    tracing::debug!(config_path = ?config.config_path, "Configuration loaded");

    let result = match &cli.command {
        Commands::Run { file, json, .. } => commands::execute_run_command(file, *json, &config),
        Commands::Demux {
            file,
            captured,
            json,
        } => commands::execute_demux_command(file, captured, *json),
        Commands::Config { json } => commands::execute_config_command(&config, *json),
    };

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(err) => {
            eprintln!("{}", err.display_for_user());
            Err(err.to_exit_code())
        }
    }
}

/// Print a configuration failure and pick its exit code.
fn report_config_error(err: &anyhow::Error) -> ExitCode {
    if let Some(e) = err.downcast_ref::<ScratchError>() {
        eprintln!("{}", e.display_for_user());
        return e.to_exit_code();
    }
    if let Some(e) = err.downcast_ref::<ConfigError>() {
        eprintln!("{}", e.display_for_user());
        eprintln!("  caused by: {err:#}");
        return ExitCode::CLI_ARGS;
    }
    eprintln!("error: {err:#}");
    ExitCode::CLI_ARGS
}
