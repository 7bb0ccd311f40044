//! The action-execution protocol: exactly-once semantics, idempotent replay
//! and engine-driven retry scheduling, built on top of [`crate::client::EngineClient`].

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{EngineClient, EngineClientError};
use crate::error::EndureError;
use crate::protocol::{Log, RetryMechanism};

/// Error an action implementation reports back to [`WorkflowContext::execute_action`].
///
/// `Invalid` is for contract violations the caller made (bad input, a
/// precondition that doesn't hold) — these are never retried, matching the
/// protocol's `ValueError`/validation-error short circuit. `Failed` is for
/// everything else, and is eligible for the engine's retry schedule.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl ActionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecuteActionError {
    /// The action reported an `Invalid` input/precondition error. Not retried.
    #[error("{0}")]
    Invalid(String),
    /// The engine declared the action done retrying (400/404/409 on a FAILED
    /// acknowledgment); carries the status and payload the handler responds with.
    #[error(transparent)]
    Endure(#[from] EndureError),
    /// Talking to the engine itself failed (network error, bad base URL).
    #[error(transparent)]
    Transport(#[from] EngineClientError),
    /// The engine replied with something the protocol doesn't define — an
    /// unrecognized status code, or a retryable code without `retry_at`.
    #[error("unexpected response from durable execution engine: {0}")]
    Protocol(String),
    /// The host cancelled the inbound request (client disconnect, deadline)
    /// while this action was sleeping between retries. No further engine
    /// calls are made once this is returned.
    #[error("action execution was cancelled")]
    Cancelled,
}

/// Bridges a workflow function to the durable execution engine. One instance
/// per execution; cheap to construct, holds only the execution id and a
/// shared handle to the engine client.
#[derive(Clone)]
pub struct WorkflowContext {
    execution_id: String,
    engine: Arc<EngineClient>,
    cancellation: CancellationToken,
}

impl WorkflowContext {
    pub fn new(execution_id: impl Into<String>, engine: Arc<EngineClient>) -> Self {
        Self {
            execution_id: execution_id.into(),
            engine,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// The token driving this execution's cancellation. A host that detects
    /// the inbound request was cancelled (client disconnect, deadline) calls
    /// `.cancel()` on this to abort an in-flight retry sleep promptly.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Executes `action` with durability guarantees.
    ///
    /// Reports a `STARTED` log before the first attempt, with `max_retries`
    /// and `retry_mechanism` declared once for the engine's benefit — the SDK
    /// never counts attempts locally; it keeps retrying until the engine's
    /// response to a `FAILED` acknowledgment says otherwise (see
    /// `run_with_retries`). On success, reports `COMPLETED` and returns the
    /// result. If the action was already completed by a prior attempt, the
    /// engine replies `208` and the cached output is returned without
    /// invoking `action` at all.
    pub async fn execute_action<I, O, F, Fut>(
        &self,
        action_name: Option<&str>,
        action: F,
        input: I,
        max_retries: u32,
        retry_mechanism: RetryMechanism,
    ) -> Result<O, ExecuteActionError>
    where
        I: Serialize + Clone + Send + Sync,
        O: Serialize + DeserializeOwned + Send,
        F: Fn(I) -> Fut + Send + Sync,
        Fut: Future<Output = Result<O, ActionError>> + Send,
    {
        let name = action_name
            .map(str::to_string)
            .unwrap_or_else(|| std::any::type_name::<F>().to_string());

        let input_json = serde_json::to_value(&input)
            .map_err(|err| ExecuteActionError::Protocol(format!("input is not serializable: {err}")))?;
        debug!(execution_id = %self.execution_id, action_name = %name, "sending STARTED log");
        let started = Log::started(input_json, max_retries, retry_mechanism);
        let response = self.engine.send_log(&self.execution_id, &name, &started).await?;

        match response.status_code {
            201 | 200 => self.run_with_retries(&name, action, input).await,
            208 => {
                info!(execution_id = %self.execution_id, action_name = %name, "replaying cached action result");
                let output = response
                    .payload_value("output")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Default::default()));
                serde_json::from_value(output)
                    .map_err(|err| ExecuteActionError::Protocol(format!("cached output did not deserialize: {err}")))
            }
            other => Err(ExecuteActionError::Protocol(format!(
                "unrecognized status code {other} from STARTED log"
            ))),
        }
    }

    async fn run_with_retries<I, O, F, Fut>(
        &self,
        name: &str,
        action: F,
        input: I,
    ) -> Result<O, ExecuteActionError>
    where
        I: Serialize + Clone + Send + Sync,
        O: Serialize + DeserializeOwned + Send,
        F: Fn(I) -> Fut + Send + Sync,
        Fut: Future<Output = Result<O, ActionError>> + Send,
    {
        loop {
            match action(input.clone()).await {
                Ok(output) => {
                    let output_json = serde_json::to_value(&output).map_err(|err| {
                        ExecuteActionError::Protocol(format!("action output is not serializable: {err}"))
                    })?;
                    self.engine
                        .send_log(&self.execution_id, name, &Log::completed(output_json))
                        .await?;
                    info!(execution_id = %self.execution_id, action_name = %name, "action completed");
                    return Ok(output);
                }
                Err(ActionError::Invalid(message)) => {
                    warn!(execution_id = %self.execution_id, action_name = %name, %message, "action reported an invalid input, not retrying");
                    self.engine
                        .send_log(
                            &self.execution_id,
                            name,
                            &Log::failed(serde_json::json!({ "error": message })),
                        )
                        .await?;
                    return Err(ExecuteActionError::Invalid(message));
                }
                Err(ActionError::Failed(err)) => {
                    let response = self
                        .engine
                        .send_log(
                            &self.execution_id,
                            name,
                            &Log::failed(serde_json::json!({ "error": err.to_string() })),
                        )
                        .await?;
                    match response.status_code {
                        200 => {
                            let Some(retry_at) = response.payload_value("retry_at").and_then(Value::as_f64) else {
                                error!(execution_id = %self.execution_id, action_name = %name, "engine acknowledged retry without a retry_at");
                                return Err(ExecuteActionError::Protocol(
                                    "retryable FAILED acknowledgment had no retry_at".to_string(),
                                ));
                            };
                            if !self.sleep_until(retry_at).await {
                                warn!(execution_id = %self.execution_id, action_name = %name, "retry sleep cancelled, aborting without further engine calls");
                                return Err(ExecuteActionError::Cancelled);
                            }
                        }
                        400 | 404 => {
                            error!(execution_id = %self.execution_id, action_name = %name, status = response.status_code, "engine ended retries");
                            return Err(ExecuteActionError::Endure(EndureError::exhausted()));
                        }
                        409 => {
                            warn!(execution_id = %self.execution_id, action_name = %name, "execution paused or terminated by engine");
                            return Err(ExecuteActionError::Endure(EndureError::paused_or_terminated()));
                        }
                        other => {
                            return Err(ExecuteActionError::Protocol(format!(
                                "unrecognized status code {other} from FAILED log"
                            )))
                        }
                    }
                }
            }
        }
    }

    /// Sleeps until `retry_at_unix`, or until the host cancels this
    /// execution's token, whichever comes first. Returns `false` if
    /// cancellation won the race, so the caller can abort the retry loop
    /// instead of proceeding as if the sleep completed normally.
    async fn sleep_until(&self, retry_at_unix: f64) -> bool {
        if self.cancellation.is_cancelled() {
            return false;
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        let sleep_seconds = retry_at_unix - now;
        if sleep_seconds <= 0.0 {
            warn!(execution_id = %self.execution_id, "retry_at already elapsed, retrying immediately");
            return true;
        }
        let duration = Duration::from_secs_f64(sleep_seconds);
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.cancellation.cancelled() => false,
        }
    }
}
