use std::time::Duration;

use async_trait::async_trait;
use onair_core::config::BackendConfig;
use onair_core::ActorId;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::collaborator::{Actor, Collaborator};
use crate::error::{Result, StoreError};
use crate::query::{Filter, Query, Table};

/// PostgREST-style client for the hosted database.
///
/// Rows live under `{url}/rest/v1/{table}`, the session user under
/// `{url}/auth/v1/user`. Transport failures are retried a fixed number of
/// times with a fixed delay; HTTP error statuses are not retried.
pub struct RestCollaborator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    retries: u32,
    retry_delay: Duration,
}

impl RestCollaborator {
    pub fn new(cfg: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| StoreError::Connectivity(e.to_string()))?;
        Ok(Self {
            client,
            base_url: cfg.url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            access_token: cfg.access_token.clone(),
            retries: cfg.retries,
            retry_delay: Duration::from_millis(cfg.retry_delay_ms),
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    /// Send the request built by `build`, retrying transport failures.
    async fn send_with_retry<F>(&self, what: &str, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            match build().send().await {
                Ok(resp) => {
                    if attempt > 0 {
                        info!(what, attempt, "request succeeded after retry");
                    }
                    return Ok(resp);
                }
                Err(e) => {
                    let err = classify_transport_error(e);
                    if !err.is_connectivity_error() || attempt >= self.retries {
                        return Err(err);
                    }
                    attempt += 1;
                    warn!(what, attempt, error = %err, "backend request failed; retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}

fn classify_transport_error(e: reqwest::Error) -> StoreError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        StoreError::Connectivity(e.to_string())
    } else {
        StoreError::Decode(e.to_string())
    }
}

async fn expect_rows(resp: reqwest::Response) -> Result<Vec<Value>> {
    let status = resp.status().as_u16();
    if !resp.status().is_success() {
        let message = resp.text().await.unwrap_or_default();
        warn!(status, body = %message, "backend API error");
        return Err(StoreError::Api { status, message });
    }
    resp.json::<Vec<Value>>()
        .await
        .map_err(|e| StoreError::Decode(e.to_string()))
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
}

#[async_trait]
impl Collaborator for RestCollaborator {
    fn name(&self) -> &str {
        "rest"
    }

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>> {
        let url = self.table_url(table);
        let params = query.to_params();
        debug!(%table, filters = query.filters.len(), "select");
        let resp = self
            .send_with_retry(table.name(), || {
                self.client
                    .get(&url)
                    .query(&params)
                    .header("apikey", &self.api_key)
                    .bearer_auth(self.bearer())
            })
            .await?;
        expect_rows(resp).await
    }

    async fn update(&self, table: Table, patch: Value, filters: &[Filter]) -> Result<Vec<Value>> {
        let url = self.table_url(table);
        let params: Vec<(String, String)> = filters.iter().map(Filter::to_param).collect();
        debug!(%table, "update");
        let resp = self
            .send_with_retry(table.name(), || {
                self.client
                    .patch(&url)
                    .query(&params)
                    .header("apikey", &self.api_key)
                    .header("Prefer", "return=representation")
                    .bearer_auth(self.bearer())
                    .json(&patch)
            })
            .await?;
        expect_rows(resp).await
    }

    async fn current_actor(&self) -> Result<Option<Actor>> {
        let Some(token) = self.access_token.as_deref() else {
            return Ok(None);
        };
        let url = format!("{}/auth/v1/user", self.base_url);
        let resp = self
            .send_with_retry("auth.user", || {
                self.client
                    .get(&url)
                    .header("apikey", &self.api_key)
                    .bearer_auth(token)
            })
            .await?;

        let status = resp.status().as_u16();
        if status == 401 || status == 403 {
            debug!(status, "session token rejected");
            return Ok(None);
        }
        if !resp.status().is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, message });
        }
        let user: AuthUser = resp
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Some(Actor {
            id: ActorId::from(user.id),
            email: user.email,
        }))
    }
}
