//! Environment overrides
//!
//! The lookup is injected so overrides can be tested without mutating the
//! process environment. Empty values count as unset.

use std::path::PathBuf;

use crate::{Config, ConfigError, DeployTarget, FailurePolicy};

impl Config {
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("POSTMAN_API_KEY") {
            self.collection.api_key = Some(v);
        }
        if let Some(v) = get("POSTMAN_COLLECTION_ID") {
            self.collection.id = Some(v);
        }
        if let Some(v) = get("POSTMAN_API_BASE") {
            self.collection.api_base = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("COLLECTION_FILE") {
            self.collection.file = Some(PathBuf::from(v));
        }

        if let Some(v) = get("HISTORY_RETENTION") {
            self.history.retention = parse_count("HISTORY_RETENTION", &v)?;
        }
        if let Some(v) = get("TREND_WINDOW") {
            self.history.trend_window = parse_count("TREND_WINDOW", &v)?;
        }

        if let Some(v) = get("DEPLOY_TARGET") {
            self.deploy.target =
                DeployTarget::parse(&v).ok_or_else(|| ConfigError::InvalidValue {
                    var: "DEPLOY_TARGET",
                    value: v.clone(),
                    reason: "expected none, surge or pages".to_string(),
                })?;
        }
        if let Some(v) = get("SURGE_DOMAIN") {
            self.deploy.surge.domain = Some(v);
        }
        if let Some(v) = get("SURGE_TOKEN") {
            self.deploy.surge.token = Some(v);
        }
        if let Some(v) = get("SURGE_LOGIN") {
            self.deploy.surge.login = Some(v);
        }
        if let Some(v) = get("SURGE_PASSWORD") {
            self.deploy.surge.password = Some(v);
        }
        if let Some(v) = get("GITHUB_TOKEN") {
            self.deploy.pages.token = Some(v);
        }
        if let Some(v) = get("GITHUB_REPOSITORY") {
            self.deploy.pages.repository = Some(v);
        }
        if let Some(v) = get("PAGES_BRANCH") {
            self.deploy.pages.branch = v;
        }

        // A bare SURGE_DOMAIN or GITHUB_REPOSITORY selects the target when
        // none was chosen explicitly.
        if self.deploy.target == DeployTarget::None && get("DEPLOY_TARGET").is_none() {
            if self.deploy.surge.domain.is_some() {
                self.deploy.target = DeployTarget::Surge;
            } else if self.deploy.pages.repository.is_some() && self.deploy.pages.token.is_some()
            {
                self.deploy.target = DeployTarget::Pages;
            }
        }

        if let Some(v) = get("WEBHOOK_URL") {
            self.notify.webhook_url = Some(v);
        }
        if let Some(v) = get("REPORT_URL") {
            self.notify.report_url = Some(v);
        }
        if let Some(v) = get("BUILD_URL") {
            self.report.build_url = Some(v);
        }

        if let Some(v) = get("FAILURE_POLICY") {
            self.failure_policy =
                FailurePolicy::parse(&v).ok_or_else(|| ConfigError::InvalidValue {
                    var: "FAILURE_POLICY",
                    value: v.clone(),
                    reason: "expected fail-fast or best-effort".to_string(),
                })?;
        }

        Ok(())
    }
}

fn parse_count(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: e.to_string(),
        })
}
