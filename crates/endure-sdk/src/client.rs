//! Thin HTTP client for the two operations the engine exposes to workers:
//! reporting action state (`send_log`) and acknowledging execution start
//! (`mark_execution_as_running`).

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::EngineClientConfig;
use crate::protocol::{EngineResponse, Log};

#[derive(Debug, thiserror::Error)]
pub enum EngineClientError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("durable execution engine is unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
}

/// Talks to a single durable execution engine instance over HTTP.
///
/// Mirrors `AnthropicLlmDriver`: a `reqwest::Client` plus the resolved base
/// URL, constructed once via [`EngineClient::from_env`] and shared behind an
/// `Arc` by callers.
pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl EngineClient {
    pub fn new(config: EngineClientConfig) -> Result<Self, EngineClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(EngineClientError::Unreachable)?;
        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    pub fn from_env() -> Result<Self, crate::config::ConfigError> {
        let config = EngineClientConfig::from_env()?;
        Ok(Self::new(config).expect("reqwest client construction cannot fail for a bare timeout"))
    }

    /// Reports the state of one action-execution attempt.
    ///
    /// `execution_id`, `action_name` must be non-empty; the Python SDK
    /// raises `ValueError` for the same condition, so we do too, just typed.
    pub async fn send_log(
        &self,
        execution_id: &str,
        action_name: &str,
        log: &Log,
    ) -> Result<EngineResponse, EngineClientError> {
        if execution_id.is_empty() || action_name.is_empty() {
            return Err(EngineClientError::InvalidArgument(
                "execution_id and action_name must be provided".to_string(),
            ));
        }
        let url = format!(
            "{}/executions/{}/log/{}",
            self.base_url, execution_id, action_name
        );
        debug!(execution_id, action_name, status = ?log.status, "sending action log");
        let response = self.http.patch(&url).json(log).send().await?;
        Self::normalize(response).await
    }

    /// Acknowledges that a workflow execution has started running.
    pub async fn mark_execution_as_running(
        &self,
        execution_id: &str,
    ) -> Result<EngineResponse, EngineClientError> {
        if execution_id.is_empty() {
            return Err(EngineClientError::InvalidArgument(
                "execution_id must be provided".to_string(),
            ));
        }
        let url = format!("{}/executions/{}/started", self.base_url, execution_id);
        let response = self.http.patch(&url).send().await?;
        Self::normalize(response).await
    }

    /// Converts a `reqwest::Response` into an [`EngineResponse`] without
    /// treating non-2xx statuses as transport errors — the caller dispatches
    /// on `status_code` itself (200/201/208 are all "successful" outcomes
    /// here, unlike `requests.raise_for_status()` in the source SDK, because
    /// our retry state machine needs to see 4xx/5xx payloads too).
    async fn normalize(response: reqwest::Response) -> Result<EngineResponse, EngineClientError> {
        let status_code = response.status().as_u16();
        let bytes = response.bytes().await?;
        let payload: BTreeMap<String, Value> = if bytes.is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(%err, "engine response body was not valid JSON, treating as empty payload");
                BTreeMap::new()
            })
        };
        Ok(EngineResponse { status_code, payload })
    }
}
