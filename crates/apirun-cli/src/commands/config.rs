use std::process::ExitCode;

use anyhow::Result;
use apirun_config::Config;

/// Credentials are never serialized, so the output is safe to paste.
pub fn handle(config: &Config) -> Result<ExitCode> {
    print!("{}", config.to_toml()?);

    if let Err(e) = config.validate() {
        eprintln!("warning: {}", e);
    }
    Ok(ExitCode::SUCCESS)
}
