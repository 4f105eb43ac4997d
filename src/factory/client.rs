use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::retry::{AttemptError, RetryPolicy};
use super::{RunFilter, RunQueryApi};
use crate::config::{FactoryConfig, RetryConfig};
use crate::error::ReportError;
use crate::model::{ActivityRecord, PipelineRun};

const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Refresh this long before the token actually expires.
const TOKEN_SLACK: Duration = Duration::from_secs(120);

/// Data factory client over the Azure management REST API, authenticated
/// as a service principal (client credentials).
pub struct AzureFactoryClient {
    http: Client,
    config: FactoryConfig,
    client_secret: String,
    retry: RetryPolicy,
    token: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    value: String,
    refresh_after: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// One page of a `query*` response.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPage<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    continuation_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PagedFilter<'a> {
    #[serde(flatten)]
    filter: &'a RunFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    continuation_token: Option<&'a str>,
}

impl AzureFactoryClient {
    /// Build a client; the service principal secret is read from the
    /// environment variable named in `factory.client_secret_env`.
    pub fn new(factory: &FactoryConfig, retry: &RetryConfig) -> Result<Self> {
        let client_secret = std::env::var(&factory.client_secret_env).with_context(|| {
            format!(
                "service principal secret not set (expected in ${})",
                factory.client_secret_env
            )
        })?;

        let http = Client::builder()
            .timeout(retry.request_timeout())
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            http,
            config: factory.clone(),
            client_secret,
            retry: RetryPolicy::from_config(retry),
            token: Mutex::new(None),
        })
    }

    fn factory_url(&self) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.DataFactory/factories/{}",
            self.config.management_url.trim_end_matches('/'),
            self.config.subscription_id,
            self.config.resource_group,
            self.config.factory_name,
        )
    }

    async fn bearer_token(&self) -> Result<String, AttemptError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_after {
                return Ok(token.value.clone());
            }
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.login_url.trim_end_matches('/'),
            self.config.tenant_id
        );
        debug!(tenant = %self.config.tenant_id, "Requesting management API token");

        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", MANAGEMENT_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| AttemptError::from_reqwest(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::from_status(status, &format!("token request rejected: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AttemptError::from_reqwest(&e))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_SLACK);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_after: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn post_page<T: DeserializeOwned>(
        &self,
        url: &str,
        filter: &RunFilter,
        continuation_token: Option<&str>,
    ) -> Result<QueryPage<T>, AttemptError> {
        let token = self.bearer_token().await?;
        let body = PagedFilter {
            filter,
            continuation_token,
        };

        let response = self
            .http
            .post(url)
            .query(&[("api-version", self.config.api_version.as_str())])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AttemptError::from_reqwest(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::from_status(status, &body));
        }

        response.json().await.map_err(|e| AttemptError::from_reqwest(&e))
    }

    /// Follow `continuationToken` until the result set is exhausted. Each
    /// page is retried on its own.
    async fn query_all<T: DeserializeOwned>(
        &self,
        what: &str,
        url: &str,
        filter: &RunFilter,
    ) -> Result<Vec<T>, ReportError> {
        let mut items = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let page: QueryPage<T> = self
                .retry
                .run(what, || self.post_page(url, filter, continuation.as_deref()))
                .await?;
            items.extend(page.value);
            match page.continuation_token {
                Some(token) if !token.is_empty() => continuation = Some(token),
                _ => return Ok(items),
            }
        }
    }
}

#[async_trait::async_trait]
impl RunQueryApi for AzureFactoryClient {
    async fn query_runs(&self, filter: &RunFilter) -> Result<Vec<PipelineRun>, ReportError> {
        let url = format!("{}/queryPipelineRuns", self.factory_url());
        let runs: Vec<PipelineRun> = self.query_all("queryPipelineRuns", &url, filter).await?;
        info!(factory = %self.config.factory_name, runs = runs.len(), "Queried pipeline runs");
        Ok(runs)
    }

    async fn query_activities(
        &self,
        run_id: &str,
        filter: &RunFilter,
    ) -> Result<Vec<ActivityRecord>, ReportError> {
        let url = format!("{}/pipelineruns/{}/queryActivityruns", self.factory_url(), run_id);
        let records: Vec<ActivityRecord> =
            self.query_all("queryActivityruns", &url, filter).await?;
        debug!(%run_id, activities = records.len(), "Queried activity runs");
        Ok(records)
    }
}
