use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use staking_model::{parse_history, parse_snapshot, HistoryPoint, SchemaError, Snapshot};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("http {status} {status_text}")]
    HttpStatus { status: u16, status_text: String },
    #[error("unexpected payload: {0}")]
    Parse(#[from] SchemaError),
    #[error("empty response body from {0}")]
    EmptyData(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Where the dashboard gets its data from. One call per source per poll.
#[async_trait]
pub trait StakingSource: Send + Sync {
    /// Current snapshot with zero-power positions already dropped.
    async fn fetch_snapshot(&self) -> Result<Snapshot, SourceError>;

    /// Full history series, oldest first.
    async fn fetch_history(&self) -> Result<Vec<HistoryPoint>, SourceError>;
}

/// Builds the snapshot query URL: `input={"json":{"token":..,"ns":..}}`.
pub fn snapshot_url(base: &str, token: &str, ns: &str) -> Result<Url, SourceError> {
    let input = serde_json::json!({ "json": { "token": token, "ns": ns } }).to_string();
    Url::parse_with_params(base, &[("input", input)])
        .map_err(|err| SourceError::InvalidUrl(format!("{base}: {err}")))
}

pub fn parse_url(raw: &str) -> Result<Url, SourceError> {
    Url::parse(raw).map_err(|err| SourceError::InvalidUrl(format!("{raw}: {err}")))
}

#[derive(Clone)]
pub struct HttpSource {
    client: Client,
    snapshot_url: Url,
    history_url: Url,
}

impl HttpSource {
    pub fn new(snapshot_url: Url, history_url: Url, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            snapshot_url,
            history_url,
        })
    }

    pub fn snapshot_url(&self) -> &Url {
        &self.snapshot_url
    }

    pub fn history_url(&self) -> &Url {
        &self.history_url
    }

    async fn get_body(&self, url: &Url) -> Result<Vec<u8>, SourceError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(SourceError::EmptyData(url.to_string()));
        }
        debug!(url = %url, bytes = body.len(), "source responded");
        Ok(body.to_vec())
    }
}

#[async_trait]
impl StakingSource for HttpSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot, SourceError> {
        let body = self.get_body(&self.snapshot_url).await?;
        Ok(parse_snapshot(&body)?)
    }

    async fn fetch_history(&self) -> Result<Vec<HistoryPoint>, SourceError> {
        let body = self.get_body(&self.history_url).await?;
        Ok(parse_history(&body)?)
    }
}
