//! Run orchestration for apirun
//!
//! This crate provides:
//! - The external tool seams (runner, report generator, deployers, notifier)
//! - The staged [`Pipeline`] that drives one run end to end
//! - Wiring from [`apirun_config::Config`]

pub mod deploy;
pub mod notify;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod runner;
pub mod setup;

pub use deploy::{Deployer, PagesDeployer, SurgeAuth, SurgeDeployer};
pub use notify::{Notification, Notifier, WebhookNotifier, WebhookPayload};
pub use pipeline::{Pipeline, PipelinePaths};
pub use report::{AllureGenerator, ReportContext, ReportGenerator};
pub use runner::{NewmanRunner, TestRunner, parse_summary};
pub use setup::{history_store, pipeline_from_config, redactor};
