//! HTML report generation

use std::collections::BTreeMap;
use std::path::Path;

use apirun_core::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::process::{CommandSpec, run_command};

/// Run metadata shown on the report's overview page
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub run_id: String,
    pub collection_name: Option<String>,
    pub report_url: Option<String>,
}

#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// Render `results_dir` into `report_dir`. The generator is expected to
    /// write its own `history` folder into the report.
    async fn generate(
        &self,
        results_dir: &Path,
        report_dir: &Path,
        context: &ReportContext,
    ) -> Result<()>;
}

/// `allure generate <results> -o <report> --clean`
pub struct AllureGenerator {
    command: String,
    environment: BTreeMap<String, String>,
    executor_name: String,
    build_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Executor<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    build_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    build_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report_url: Option<&'a str>,
}

impl AllureGenerator {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            environment: BTreeMap::new(),
            executor_name: "apirun".to_string(),
            build_url: None,
        }
    }

    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_executor(mut self, name: impl Into<String>, build_url: Option<String>) -> Self {
        self.executor_name = name.into();
        self.build_url = build_url;
        self
    }

    /// Write `environment.properties` and `executor.json` into the results.
    pub fn write_metadata(&self, results_dir: &Path, context: &ReportContext) -> Result<()> {
        let mut properties = self.environment.clone();
        if let Some(name) = &context.collection_name {
            properties
                .entry("Collection".to_string())
                .or_insert_with(|| name.clone());
        }
        properties
            .entry("Run".to_string())
            .or_insert_with(|| context.run_id.clone());

        let mut content = String::new();
        for (key, value) in &properties {
            content.push_str(&escape_property(key, true));
            content.push('=');
            content.push_str(&escape_property(value, false));
            content.push('\n');
        }
        std::fs::write(results_dir.join("environment.properties"), content)?;

        let executor = Executor {
            name: &self.executor_name,
            kind: "apirun",
            build_name: &context.run_id,
            build_url: self.build_url.as_deref(),
            report_url: context.report_url.as_deref(),
        };
        std::fs::write(
            results_dir.join("executor.json"),
            serde_json::to_string_pretty(&executor)?,
        )?;

        Ok(())
    }
}

#[async_trait]
impl ReportGenerator for AllureGenerator {
    async fn generate(
        &self,
        results_dir: &Path,
        report_dir: &Path,
        context: &ReportContext,
    ) -> Result<()> {
        self.write_metadata(results_dir, context)
            .map_err(|e| Error::Report(format!("failed to write report metadata: {}", e)))?;

        let spec = CommandSpec::new(&self.command)
            .arg("generate")
            .path_arg(results_dir)
            .arg("-o")
            .path_arg(report_dir)
            .arg("--clean");

        let output = run_command(&spec)
            .await
            .map_err(|e| Error::Report(format!("failed to start {}: {}", self.command, e)))?;

        if !output.success() {
            return Err(Error::Report(format!(
                "{} exited with {}: {}",
                self.command,
                output.exit_code,
                output.tail(5)
            )));
        }

        tracing::info!("Report written to {}", report_dir.display());
        Ok(())
    }
}

/// Java properties escaping; keys also escape separators.
fn escape_property(text: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '=' | ':' | ' ' | '#' | '!' if is_key => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context() -> ReportContext {
        ReportContext {
            run_id: "run-1".to_string(),
            collection_name: Some("Orders API".to_string()),
            report_url: Some("https://reports.surge.sh".to_string()),
        }
    }

    #[test]
    fn test_writes_metadata() {
        let temp = TempDir::new().unwrap();
        let mut environment = BTreeMap::new();
        environment.insert("Base URL".to_string(), "https://api.example.com".to_string());

        let generator = AllureGenerator::new("allure")
            .with_environment(environment)
            .with_executor("ci", Some("https://ci.example.com/builds/7".to_string()));
        generator.write_metadata(temp.path(), &context()).unwrap();

        let properties =
            std::fs::read_to_string(temp.path().join("environment.properties")).unwrap();
        assert_eq!(
            properties,
            "Base\\ URL=https://api.example.com\nCollection=Orders API\nRun=run-1\n"
        );

        let executor: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(temp.path().join("executor.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(executor["name"], "ci");
        assert_eq!(executor["type"], "apirun");
        assert_eq!(executor["buildName"], "run-1");
        assert_eq!(executor["buildUrl"], "https://ci.example.com/builds/7");
        assert_eq!(executor["reportUrl"], "https://reports.surge.sh");
    }

    #[test]
    fn test_configured_environment_wins() {
        let temp = TempDir::new().unwrap();
        let mut environment = BTreeMap::new();
        environment.insert("Collection".to_string(), "pinned".to_string());

        AllureGenerator::new("allure")
            .with_environment(environment)
            .write_metadata(temp.path(), &context())
            .unwrap();

        let properties =
            std::fs::read_to_string(temp.path().join("environment.properties")).unwrap();
        assert!(properties.contains("Collection=pinned\n"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_report_error() {
        let temp = TempDir::new().unwrap();
        let generator = AllureGenerator::new("false");
        let err = generator
            .generate(temp.path(), &temp.path().join("report"), &context())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Report(_)));
    }

    #[tokio::test]
    async fn test_missing_tool_is_report_error() {
        let temp = TempDir::new().unwrap();
        let generator = AllureGenerator::new("apirun-no-such-allure");
        let err = generator
            .generate(temp.path(), &temp.path().join("report"), &context())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Report(_)));
    }
}
