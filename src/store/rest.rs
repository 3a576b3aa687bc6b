//! REST-backed queue store
//!
//! Talks the PostgREST dialect exposed by hosted Postgres backends: tables
//! under `/rest/v1/`, filters and ordering as query parameters, upserts via
//! `Prefer: resolution=merge-duplicates`.

use crate::config::StoreSettings;
use crate::error::QueueError;
use crate::store::provider::QueueStore;
use crate::types::{NewHistoryEntry, QueueState, QueueStateUpdate};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;
use tracing::debug;

/// Connection settings for a REST queue store
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Base URL of the backend, without the `/rest/v1` suffix
    pub url: String,
    /// API key sent as `apikey` and bearer token
    pub api_key: String,
    pub state_table: String,
    pub history_table: String,
    pub request_timeout: Duration,
}

impl From<&StoreSettings> for RestStoreConfig {
    fn from(settings: &StoreSettings) -> Self {
        Self {
            url: settings.url.clone(),
            api_key: settings.api_key.clone(),
            state_table: settings.state_table.clone(),
            history_table: settings.history_table.clone(),
            request_timeout: Duration::from_secs(settings.request_timeout_seconds),
        }
    }
}

/// Queue store backed by a PostgREST-compatible HTTP API
pub struct RestQueueStore {
    config: RestStoreConfig,
    client: reqwest::Client,
}

impl RestQueueStore {
    /// Create a new REST store client
    pub fn new(config: RestStoreConfig) -> crate::error::Result<Self> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| QueueError::ConfigurationError {
                message: "store API key contains invalid header characters".to_string(),
            })?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| QueueError::ConfigurationError {
                message: "store API key contains invalid header characters".to_string(),
            })?;
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .context("Failed to create store HTTP client")?;

        Ok(Self { config, client })
    }

    fn table_url(&self, table: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.url.trim_end_matches('/'),
            table
        )
    }

    async fn ensure_success(
        response: reqwest::Response,
        operation: &str,
    ) -> crate::error::Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(anyhow!("{} failed with status {}: {}", operation, status, body))
    }
}

#[async_trait]
impl QueueStore for RestQueueStore {
    async fn fetch_latest_state(&self) -> crate::error::Result<Option<QueueState>> {
        let url = self.table_url(&self.config.state_table);
        debug!("Fetching latest queue state from {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("select", "*"),
                ("order", "created_at.desc"),
                ("limit", "1"),
            ])
            .send()
            .await
            .context("Queue state request failed")?;

        let response = Self::ensure_success(response, "Queue state fetch").await?;
        let rows: Vec<QueueState> = response
            .json()
            .await
            .context("Malformed queue state response")?;

        Ok(rows.into_iter().next())
    }

    async fn upsert_state(&self, update: QueueStateUpdate) -> crate::error::Result<()> {
        let url = self.table_url(&self.config.state_table);
        debug!("Upserting queue state {} -> {}", update.id, update.queue_number);

        let response = self
            .client
            .post(&url)
            .query(&[("on_conflict", "id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&update)
            .send()
            .await
            .context("Queue state upsert request failed")?;

        Self::ensure_success(response, "Queue state upsert").await?;
        Ok(())
    }

    async fn append_history(&self, entry: NewHistoryEntry) -> crate::error::Result<()> {
        let url = self.table_url(&self.config.history_table);
        debug!(
            "Appending history entry {} ({})",
            entry.queue_number, entry.action
        );

        let response = self
            .client
            .post(&url)
            .header("Prefer", "return=minimal")
            .json(&entry)
            .send()
            .await
            .context("History insert request failed")?;

        Self::ensure_success(response, "History insert").await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "rest"
    }
}
