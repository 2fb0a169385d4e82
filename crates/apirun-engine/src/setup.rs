//! Wiring a [`Pipeline`] from configuration

use std::time::Duration;

use apirun_config::{Config, DeployTarget};
use apirun_core::{Error, Result};
use apirun_security::{ArtifactFilter, Redactor};
use apirun_sources::{CollectionSource, FileSource, PostmanApiSource};
use apirun_storage::HistoryStore;

use crate::deploy::{Deployer, PagesDeployer, SurgeAuth, SurgeDeployer};
use crate::notify::WebhookNotifier;
use crate::pipeline::{Pipeline, PipelinePaths};
use crate::report::AllureGenerator;
use crate::runner::NewmanRunner;

/// The history store configured for `config`
pub fn history_store(config: &Config) -> HistoryStore {
    HistoryStore::new(
        &config.paths.history_dir,
        config.history.retention,
        config.history.trend_window,
    )
}

/// The redactor configured for `config`
pub fn redactor(config: &Config) -> Result<(Redactor, ArtifactFilter)> {
    let redaction = &config.redaction;
    let redactor = Redactor::with_rules(&redaction.extra_sensitive_keys, &redaction.custom_patterns)
        .map_err(|e| Error::Config(e.to_string()))?;
    let filter = ArtifactFilter::from_config(&redaction.file_patterns)
        .map_err(|e| Error::Config(e.to_string()))?;
    Ok((redactor, filter))
}

/// Build the full pipeline. Expects a validated config.
pub fn pipeline_from_config(config: &Config) -> Result<Pipeline> {
    let paths = PipelinePaths {
        results_dir: config.paths.results_dir.clone(),
        report_dir: config.paths.report_dir.clone(),
        work_dir: config.paths.work_dir.clone(),
    };

    let source = collection_source(config)?;
    let runner = NewmanRunner::new(&config.runner.command, paths.summary_file())
        .with_extra_args(config.runner.extra_args.clone());
    let generator = AllureGenerator::new(&config.report.command)
        .with_environment(config.report.environment.clone())
        .with_executor(&config.report.executor_name, config.report.build_url.clone());
    let (redactor, filter) = redactor(config)?;

    let mut pipeline = Pipeline::new(
        source,
        Box::new(runner),
        Box::new(generator),
        history_store(config),
        paths,
    )
    .with_redactor(Box::new(redactor), filter)
    .with_policy(config.failure_policy)
    .with_title(&config.notify.title)
    .with_report_url(config.notify.report_url.clone());

    if let Some(deployer) = deployer(config)? {
        pipeline = pipeline.with_deployer(deployer);
    }
    if let Some(url) = &config.notify.webhook_url {
        let timeout = Duration::from_secs(config.collection.timeout_secs);
        pipeline = pipeline.with_notifier(Box::new(WebhookNotifier::new(url, timeout)));
    }

    Ok(pipeline)
}

fn collection_source(config: &Config) -> Result<Box<dyn CollectionSource>> {
    let collection = &config.collection;
    if let Some(file) = &collection.file {
        return Ok(Box::new(FileSource::new(file)));
    }

    match (&collection.id, &collection.api_key) {
        (Some(id), Some(key)) => Ok(Box::new(PostmanApiSource::new(
            &collection.api_base,
            id,
            key,
            Duration::from_secs(collection.timeout_secs),
        ))),
        (None, _) => Err(Error::Config("POSTMAN_COLLECTION_ID is not set".to_string())),
        (_, None) => Err(Error::Config("POSTMAN_API_KEY is not set".to_string())),
    }
}

fn deployer(config: &Config) -> Result<Option<Box<dyn Deployer>>> {
    let deploy = &config.deploy;
    match deploy.target {
        DeployTarget::None => Ok(None),
        DeployTarget::Surge => {
            let surge = &deploy.surge;
            let domain = surge
                .domain
                .clone()
                .ok_or_else(|| Error::Config("SURGE_DOMAIN is not set".to_string()))?;
            let auth = match (&surge.token, &surge.login, &surge.password) {
                (Some(token), _, _) => SurgeAuth::Token(token.clone()),
                (None, Some(login), Some(password)) => SurgeAuth::Login {
                    login: login.clone(),
                    password: password.clone(),
                },
                _ => return Err(Error::Config("SURGE_TOKEN is not set".to_string())),
            };
            Ok(Some(Box::new(SurgeDeployer::new("surge", domain, auth))))
        }
        DeployTarget::Pages => {
            let pages = &deploy.pages;
            let (Some(repository), Some(token)) = (&pages.repository, &pages.token) else {
                return Err(Error::Config(
                    "GITHUB_REPOSITORY and GITHUB_TOKEN are required for pages".to_string(),
                ));
            };
            let deployer = PagesDeployer::new(repository, &pages.branch, token)
                .with_author(&pages.user_name, &pages.user_email);
            Ok(Some(Box::new(deployer)))
        }
    }
}
