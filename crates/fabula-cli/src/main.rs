//! Fabula CLI - Command-line front end for the Fabula voting engine.
//!
//! Loads configuration, sets up logging and dispatches subcommands.

pub mod commands;
pub mod config;
pub mod output;
pub mod scenario;
pub mod telemetry;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = commands::Cli::parse();

    let config = match &cli.config {
        Some(path) => config::CliConfig::from_file(path)?,
        None => config::CliConfig::default(),
    };
    config.validate()?;

    let level = cli.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    let json_logs = cli.json_logs || config.logging.json;
    match &config.logging.file {
        Some(file) => telemetry::init_telemetry_with_file(&level, json_logs, file)?,
        None => telemetry::init_telemetry(&level, json_logs)?,
    }

    if let Some(path) = &cli.config {
        tracing::debug!("Loaded configuration from {}", path.display());
    }

    if let Err(e) = commands::execute(cli.command, &config) {
        output::print_error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
