mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::{Context, Result};
use apirun_config::Config;
use clap::Parser;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command.unwrap_or_default() {
        Commands::Run { report_json } => commands::run::handle(&config, report_json).await,
        Commands::History => commands::history::handle(&config),
        Commands::Redact { dir, json } => commands::redact::handle(&config, &dir, json),
        Commands::Config => commands::config::handle(&config),
    }
}
