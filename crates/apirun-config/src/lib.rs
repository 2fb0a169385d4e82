use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

mod env;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for one pipeline run
///
/// Secrets (API key, deploy credentials) are never serialized back out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    #[serde(default)]
    pub collection: CollectionConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub redaction: RedactionConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub deploy: DeployConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Local collection export; takes precedence over the API when set.
    #[serde(default)]
    pub file: Option<PathBuf>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    #[serde(default = "default_history_dir")]
    pub history_dir: PathBuf,

    /// Scratch space for the downloaded collection and runner summary.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Number of past runs kept in the store.
    #[serde(default = "default_retention")]
    pub retention: usize,

    /// Maximum number of points kept in each trend file.
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Key names redacted in addition to the built-in list.
    #[serde(default)]
    pub extra_sensitive_keys: Vec<String>,

    /// Extra regexes; every match is replaced.
    #[serde(default)]
    pub custom_patterns: Vec<String>,

    /// File name globs selecting the artifacts to scan. Empty selects the
    /// built-in result, container and attachment globs.
    #[serde(default)]
    pub file_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_runner_command")]
    pub command: String,

    #[serde(default)]
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_command")]
    pub command: String,

    /// Written to `environment.properties` in the results directory.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    #[serde(default = "default_executor_name")]
    pub executor_name: String,

    #[serde(default)]
    pub build_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployTarget {
    #[default]
    None,
    Surge,
    Pages,
}

impl DeployTarget {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Some(DeployTarget::None),
            "surge" => Some(DeployTarget::Surge),
            "pages" | "gh-pages" | "github-pages" => Some(DeployTarget::Pages),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub target: DeployTarget,

    #[serde(default)]
    pub surge: SurgeConfig,

    #[serde(default)]
    pub pages: PagesConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurgeConfig {
    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    #[serde(default, skip_serializing)]
    pub login: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagesConfig {
    /// `owner/name` of the GitHub repository.
    #[serde(default)]
    pub repository: Option<String>,

    #[serde(default = "default_pages_branch")]
    pub branch: String,

    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    #[serde(default = "default_git_user")]
    pub user_name: String,

    #[serde(default = "default_git_email")]
    pub user_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default, skip_serializing)]
    pub webhook_url: Option<String>,

    /// Overrides the URL reported by the deployer.
    #[serde(default)]
    pub report_url: Option<String>,

    #[serde(default = "default_notify_title")]
    pub title: String,
}

/// What a report or deploy failure does to the rest of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    FailFast,
    #[default]
    BestEffort,
}

impl FailurePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fail-fast" | "strict" => Some(FailurePolicy::FailFast),
            "best-effort" | "lenient" => Some(FailurePolicy::BestEffort),
            _ => None,
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            id: None,
            api_key: None,
            api_base: default_api_base(),
            file: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            report_dir: default_report_dir(),
            history_dir: default_history_dir(),
            work_dir: default_work_dir(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
            trend_window: default_trend_window(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: default_runner_command(),
            extra_args: Vec::new(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            command: default_report_command(),
            environment: BTreeMap::new(),
            executor_name: default_executor_name(),
            build_url: None,
        }
    }
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            repository: None,
            branch: default_pages_branch(),
            token: None,
            user_name: default_git_user(),
            user_email: default_git_email(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            report_url: None,
            title: default_notify_title(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.getpostman.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("allure-results")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("allure-report")
}

fn default_history_dir() -> PathBuf {
    PathBuf::from(".history")
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".apirun")
}

fn default_retention() -> usize {
    3
}

fn default_trend_window() -> usize {
    10
}

fn default_runner_command() -> String {
    "newman".to_string()
}

fn default_report_command() -> String {
    "allure".to_string()
}

fn default_executor_name() -> String {
    "apirun".to_string()
}

fn default_pages_branch() -> String {
    "gh-pages".to_string()
}

fn default_git_user() -> String {
    "apirun".to_string()
}

fn default_git_email() -> String {
    "apirun@users.noreply.github.com".to_string()
}

fn default_notify_title() -> String {
    "API test run".to_string()
}

impl Config {
    /// Load the optional config file, then apply environment overrides.
    /// An explicitly named file must exist.
    pub fn load(explicit: Option<&str>) -> Result<Self, ConfigError> {
        let explicit = explicit.filter(|p| !p.is_empty());
        if let Some(path) = explicit {
            let path = Path::new(path);
            if !path.exists() {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "config file not found",
                    ),
                });
            }
        }
        let mut config = match Self::config_path(explicit) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Config file location: explicit path, then `./apirun.toml`, then the
    /// per-user config directory.
    pub fn config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit.filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }

        let local = PathBuf::from("apirun.toml");
        if local.exists() {
            return Some(local);
        }

        directories::ProjectDirs::from("com", "apirun", "apirun")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Check the settings a run cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.file.is_none() {
            if self.collection.api_key.is_none() {
                return Err(ConfigError::Missing("POSTMAN_API_KEY"));
            }
            if self.collection.id.is_none() {
                return Err(ConfigError::Missing("POSTMAN_COLLECTION_ID"));
            }
        }

        if self.history.retention == 0 {
            return Err(ConfigError::InvalidValue {
                var: "HISTORY_RETENTION",
                value: "0".to_string(),
                reason: "must keep at least one run".to_string(),
            });
        }
        if self.history.trend_window == 0 {
            return Err(ConfigError::InvalidValue {
                var: "TREND_WINDOW",
                value: "0".to_string(),
                reason: "must keep at least one point".to_string(),
            });
        }

        match self.deploy.target {
            DeployTarget::None => {}
            DeployTarget::Surge => {
                let surge = &self.deploy.surge;
                if surge.domain.is_none() {
                    return Err(ConfigError::Missing("SURGE_DOMAIN"));
                }
                let has_login = surge.login.is_some() && surge.password.is_some();
                if surge.token.is_none() && !has_login {
                    return Err(ConfigError::Missing("SURGE_TOKEN"));
                }
            }
            DeployTarget::Pages => {
                if self.deploy.pages.repository.is_none() {
                    return Err(ConfigError::Missing("GITHUB_REPOSITORY"));
                }
                if self.deploy.pages.token.is_none() {
                    return Err(ConfigError::Missing("GITHUB_TOKEN"));
                }
            }
        }

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
