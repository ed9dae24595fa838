//! CLI command implementations.

use clap::{Parser, Subcommand};
use colored::Colorize;
use fabula_governance::{VotingPower, Weight};
use std::path::{Path, PathBuf};

use crate::config::CliConfig;
use crate::output::*;
use crate::scenario::{Scenario, ScenarioReport, StepResult};

/// Main CLI.
#[derive(Parser)]
#[command(name = "fabula")]
#[command(about = "Fabula - Quadratic voting for collaborative stories")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Config file path
    #[arg(short, long, global = true, value_name = "FILE", env = "FABULA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (overrides the config file)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Replay a scenario file through the voting engine
    Run {
        /// Scenario file (TOML)
        scenario: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show voting power for a balance
    Power {
        /// Token balance
        #[arg(long, allow_negative_numbers = true)]
        balance: i128,
        /// Tokens already committed to open ballots
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        locked: i128,
    },

    /// Show the token cost of a vote weight
    Cost {
        #[arg(allow_negative_numbers = true)]
        weight: i64,
    },

    /// Configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Config commands.
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write the default config to a file
    Init {
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show the effective config
    Show,
}

/// Execute CLI command.
pub fn execute(cmd: Commands, config: &CliConfig) -> anyhow::Result<()> {
    match cmd {
        Commands::Run { scenario, json } => execute_run(&scenario, json, config),
        Commands::Power { balance, locked } => execute_power(balance, locked),
        Commands::Cost { weight } => execute_cost(weight),
        Commands::Config(cmd) => execute_config(cmd, config),
    }
}

fn execute_run(path: &Path, json: bool, config: &CliConfig) -> anyhow::Result<()> {
    let scenario = Scenario::from_file(path)?;
    let report = scenario.run(&config.governance)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &ScenarioReport) {
    for step in &report.steps {
        println!("{} {}", format!("[{}]", step.at).dimmed(), step.step.bold());
        match &step.result {
            StepResult::Ballot { ballot } => print_ballot(ballot),
            StepResult::Tally { tally, remaining_secs } => print_tally(tally, *remaining_secs),
            StepResult::Outcome { round, outcome } => print_outcome(round.as_str(), outcome),
            StepResult::Closed { round } => print_info(&format!("Round {} closed", round)),
            StepResult::Implemented { proposal } => {
                print_success(&format!("{} is now canon", proposal))
            }
            StepResult::Power { power, .. } => print_power(power),
            StepResult::Failed { error, message } => {
                print_error(&format!("{} ({})", message, error))
            }
        }
        println!();
    }

    println!("{}", "Proposals".bold());
    println!("{}", "=".repeat(50));
    for (proposal, status) in &report.proposals {
        println!("{:<24} {}", proposal.as_str(), status.as_str().bright_cyan());
    }

    let failures = report.failures();
    if failures > 0 {
        print_warning(&format!("{} step(s) refused by the engine", failures));
    }
}

fn execute_power(balance: i128, locked: i128) -> anyhow::Result<()> {
    let power = VotingPower::from_signed(balance, locked)?;
    print_power(&power);
    Ok(())
}

fn execute_cost(weight: i64) -> anyhow::Result<()> {
    let weight = Weight::from_signed(weight)?;
    println!(
        "Weight {} costs {} tokens",
        weight.get().to_string().bright_magenta(),
        format_tokens(weight.cost()).bright_yellow()
    );
    Ok(())
}

fn execute_config(cmd: ConfigCommands, config: &CliConfig) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            CliConfig::default().to_file(&path)?;
            print_success(&format!("Wrote default configuration to {}", path.display()));
        }
        ConfigCommands::Show => {
            println!("{}", "Fabula Configuration".bold());
            println!("{}", "=".repeat(50));
            print!("{}", toml::to_string_pretty(config)?);
        }
    }

    Ok(())
}
