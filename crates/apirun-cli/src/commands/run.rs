use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use apirun_config::Config;
use apirun_core::{PipelineReport, StageStatus};
use apirun_engine::pipeline_from_config;

pub async fn handle(config: &Config, report_json: Option<PathBuf>) -> Result<ExitCode> {
    config.validate().context("Invalid configuration")?;
    let pipeline = pipeline_from_config(config)?;

    let report = pipeline.run().await;

    let path = report_json.unwrap_or_else(|| pipeline.paths().work_dir.join("last-run.json"));
    if let Err(e) = write_report(&path, &report) {
        tracing::warn!("Failed to write run report to {}: {:#}", path.display(), e);
    }

    print_report(&report);

    Ok(ExitCode::from(report.exit_code() as u8))
}

fn write_report(path: &std::path::Path, report: &PipelineReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}

fn print_report(report: &PipelineReport) {
    let mark = if report.exit_code() == 0 { "✓" } else { "✗" };
    println!("{} Run {}", mark, report.run_id);

    if let Some(summary) = &report.summary {
        println!(
            "  Requests: {} ({} failed)",
            summary.requests.total, summary.requests.failed
        );
        println!(
            "  Assertions: {}/{} passed ({:.1}%)",
            summary.assertions.passed(),
            summary.assertions.total,
            summary.success_rate()
        );
    }
    if let Some(url) = &report.report_url {
        println!("  Report: {}", url);
    }
    if let Some(reason) = &report.abort_reason {
        println!("  Aborted: {}", reason);
    }

    println!("  Stages:");
    for outcome in &report.stages {
        match &outcome.status {
            StageStatus::Passed => {
                println!("    ✓ {} ({}ms)", outcome.stage, outcome.duration_ms)
            }
            StageStatus::Failed(reason) => println!("    ✗ {}: {}", outcome.stage, reason),
            StageStatus::Skipped(reason) => {
                println!("    - {} (skipped: {})", outcome.stage, reason)
            }
        }
    }
}
