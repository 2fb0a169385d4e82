//! Chat notification after a published run

use std::time::Duration;

use apirun_core::{Error, Result, RunSummary};
use async_trait::async_trait;
use serde::Serialize;

/// What gets announced for one run
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub summary: RunSummary,
    pub report_url: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct WebhookPayload {
    pub text: String,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
}

impl Notification {
    pub fn payload(&self) -> WebhookPayload {
        let assertions = self.summary.assertions;
        let rate = (self.summary.success_rate() * 100.0).round() / 100.0;

        let mut text = format!(
            "{}: {}/{} assertions passed ({:.2}%)",
            self.title,
            assertions.passed(),
            assertions.total,
            rate
        );
        if assertions.failed > 0 {
            text.push_str(&format!(", {} failed", assertions.failed));
        }
        if let Some(url) = &self.report_url {
            text.push_str(&format!("\nReport: {}", url));
        }

        WebhookPayload {
            text,
            total: assertions.total,
            passed: assertions.passed(),
            failed: assertions.failed,
            success_rate: rate,
            report_url: self.report_url.clone(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// POSTs the payload as JSON (Slack-compatible `text` field)
pub struct WebhookNotifier {
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Notify(format!("Failed to create HTTP client: {}", e)))?;

        // Webhook URLs carry their own secret, so it stays out of messages
        let response = client
            .post(&self.url)
            .json(&notification.payload())
            .send()
            .await
            .map_err(|e| Error::Notify(format!("webhook request failed: {}", e.without_url())))?;

        if !response.status().is_success() {
            return Err(Error::Notify(format!(
                "webhook returned HTTP {}",
                response.status().as_u16()
            )));
        }

        tracing::info!("Notification sent");
        Ok(())
    }
}
