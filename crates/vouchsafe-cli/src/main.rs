//! Vouchsafe CLI - Candidate commitments, proofs and escrow simulations.

pub mod candidates;
pub mod commands;
pub mod config;
pub mod output;
pub mod scenario;
pub mod telemetry;

use clap::Parser;

use crate::config::CliConfig;

fn main() -> anyhow::Result<()> {
    let cli = commands::Cli::parse();

    let config = match &cli.config {
        Some(path) => CliConfig::from_file(path)?,
        None => CliConfig::default(),
    };
    config.validate()?;

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let json_logs = cli.json_logs || config.logging.format == "json";
    match &config.logging.log_file {
        Some(file) => telemetry::init_telemetry_with_file(level, json_logs, file)?,
        None => telemetry::init_telemetry(level, json_logs)?,
    }

    if let Err(e) = commands::execute(cli.command, &config) {
        output::print_error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
