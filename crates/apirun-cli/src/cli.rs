use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "apirun")]
#[command(about = "Run API test collections and publish redacted reports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (TOML); environment variables override it
    #[arg(long, global = true, env = "APIRUN_CONFIG")]
    pub config: Option<String>,

    /// Defaults to `run`
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Fetch, execute, redact, report and publish
    Run {
        /// Where to write the run report as JSON (default: <work_dir>/last-run.json)
        #[arg(long)]
        report_json: Option<PathBuf>,
    },

    /// List retained history entries, newest first
    History,

    /// Redact result artifacts in a directory in place
    Redact {
        /// Results directory to scrub
        dir: PathBuf,

        /// Print the redaction report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration (credentials omitted)
    Config,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run { report_json: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_runs() {
        let cli = Cli::try_parse_from(["apirun"]).unwrap();
        assert_eq!(cli.command.unwrap_or_default(), Commands::default());
    }

    #[test]
    fn test_redact_args() {
        let cli = Cli::try_parse_from(["apirun", "redact", "allure-results", "--json"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Redact {
                dir: PathBuf::from("allure-results"),
                json: true,
            })
        );
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["apirun", "history", "--config", "ci/apirun.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("ci/apirun.toml"));
        assert_eq!(cli.command, Some(Commands::History));
    }

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
