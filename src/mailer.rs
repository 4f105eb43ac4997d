//! Report delivery by mail.

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;
use tracing::info;

use crate::config::MailConfig;
use crate::error::ReportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Fire-and-forget delivery. Failures go back to the caller; nothing retries.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), ReportError>;
}

/// Delivery through the SendGrid v3 mail API.
pub struct SendGridMailer {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl SendGridMailer {
    pub fn from_config(cfg: &MailConfig, timeout: std::time::Duration) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .with_context(|| format!("mail API key not set (expected in ${})", cfg.api_key_env))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
            api_key,
        })
    }

    fn body(message: &MailMessage) -> serde_json::Value {
        let to: Vec<_> = message.recipients.iter().map(|r| json!({ "email": r })).collect();
        json!({
            "personalizations": [{ "to": to }],
            "from": { "email": message.from },
            "subject": message.subject,
            "content": [{ "type": "text/html", "value": message.html }],
        })
    }
}

#[async_trait::async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), ReportError> {
        if message.recipients.is_empty() {
            return Err(ReportError::MailSendFailure("no recipients".to_string()));
        }

        info!(recipients = message.recipients.len(), subject = %message.subject, "Emailing report");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&Self::body(message))
            .send()
            .await
            .map_err(|e| ReportError::MailSendFailure(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ReportError::MailSendFailure(format!("HTTP {status}: {body}")))
        }
    }
}
