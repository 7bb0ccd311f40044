//! Environment-resolved configuration for the engine client.

use std::time::Duration;

const BASE_URL_VAR: &str = "DURABLE_ENGINE_BASE_URL";
const TIMEOUT_MS_VAR: &str = "DURABLE_ENGINE_TIMEOUT_MS";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Configuration for talking to the durable execution engine.
#[derive(Debug, Clone)]
pub struct EngineClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingVar(&'static str),
    #[error("{0} is set but not a valid integer: {1}")]
    InvalidInt(&'static str, String),
}

impl EngineClientConfig {
    /// Resolves configuration from the process environment, mirroring the
    /// Python SDK's lazy `os.environ["DURABLE_ENGINE_BASE_URL"]` lookup: the
    /// base URL is required, the timeout is optional with a 30s default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var(BASE_URL_VAR).map_err(|_| ConfigError::MissingVar(BASE_URL_VAR))?;
        let timeout = match std::env::var(TIMEOUT_MS_VAR) {
            Ok(raw) => {
                let millis: u64 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidInt(TIMEOUT_MS_VAR, raw))?;
                Duration::from_millis(millis)
            }
            Err(_) => Duration::from_millis(DEFAULT_TIMEOUT_MS),
        };
        Ok(Self { base_url, timeout })
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
