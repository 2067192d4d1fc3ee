//! Vigil - heartbeat-based process supervisor
//!
//! Periodically checks that configured long-running processes are
//! alive and responsive via their heartbeat files, and runs an ordered
//! recovery pipeline for the ones that are not. Invoked by cron
//! (`vigil check`) or interactively (`vigil menu`).

mod cli;
mod commands;
mod config;
mod cron;
mod cycle;
mod error;
mod heartbeat;
mod lock;
mod logging;
mod monitor;
mod probe;
mod recovery;
mod store;
mod tui;

use cli::{Cli, Commands, CronAction};
use error::Result;
use tracing::error;

fn main() {
    // Exit codes: 0 success or benign no-op, 1 processes remained
    // unhealthy/unrecovered, 2 configuration or startup error.
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            2
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse_args();

    // Completion needs no config.
    if let Commands::Completion { shell } = &cli.command {
        Cli::generate_completion(*shell);
        return Ok(0);
    }

    let config = config::load(&cli.config)?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.config.log_level.as_str()
    };
    let _log_guard = logging::init(level, &config.config.log_dir)?;

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Config error: {e}");
        }
        return Ok(2);
    }

    match cli.command {
        Commands::Check => cycle::handle_check(&config),
        Commands::On { process } => Ok(commands::handle_on(&config, &process)),
        Commands::Off { process } => Ok(commands::handle_off(&config, &process)),
        Commands::Restart { process } => Ok(commands::handle_restart(&config, &process)),
        Commands::StartAll => Ok(commands::handle_start_all(&config)),
        Commands::StopAll => Ok(commands::handle_stop_all(&config)),
        Commands::Status { json } => commands::handle_status(&config, json),
        Commands::Menu => tui::run_menu(config, cli.config),
        Commands::Cron { action } => handle_cron(&config, &cli.config, action),
        Commands::Completion { .. } => unreachable!("handled above"),
    }
}

fn handle_cron(
    config: &config::VigilConfig,
    config_path: &std::path::Path,
    action: Option<CronAction>,
) -> Result<i32> {
    let line = cron::cron_line(config_path, &config.config.log_dir)?;

    match action.unwrap_or(CronAction::Show) {
        CronAction::Show => {
            println!("Add this line to your crontab (crontab -e):\n");
            println!("{line}\n");
            if cron::is_active(&line) {
                println!("(already installed)");
            }
        }
        CronAction::Install => {
            if cron::install(&line)? {
                println!("Cron entry installed.");
            } else {
                println!("Cron entry already installed.");
            }
        }
        CronAction::Remove => {
            if cron::remove(&line)? {
                println!("Cron entry removed.");
            } else {
                println!("No cron entry was installed.");
            }
        }
    }

    Ok(0)
}
