use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use apirun_config::Config;
use apirun_security::{RedactionReport, redact_artifacts};

pub fn handle(config: &Config, dir: &Path, json: bool) -> Result<ExitCode> {
    let report = redact_dir(config, dir)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "✓ Scanned {} artifact(s), changed {}, replaced {} value(s)",
        report.files_scanned,
        report.files_changed,
        report.total()
    );
    for info in &report.redactions {
        println!("  {}: {} x{}", info.artifact_id, info.redaction_type, info.count);
    }

    Ok(ExitCode::SUCCESS)
}

fn redact_dir(config: &Config, dir: &Path) -> Result<RedactionReport> {
    let (redactor, filter) = apirun_engine::redactor(config)?;
    redact_artifacts(dir, &filter, &redactor)
        .with_context(|| format!("Failed to redact {}", dir.display()))
}
