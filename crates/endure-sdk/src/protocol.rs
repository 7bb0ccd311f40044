//! Wire types shared between the engine client and the action executor.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of a single action-execution attempt, as reported to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Started,
    Completed,
    Failed,
}

/// Declarative retry strategy sent to the engine. The engine — not the SDK —
/// turns this into an actual delay; see [`crate::context::WorkflowContext::execute_action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryMechanism {
    Exponential,
    Linear,
    Constant,
}

/// A single state report sent to the engine for one `(execution_id, action_name)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    pub status: LogStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "retry_method")]
    pub retry_mechanism: Option<RetryMechanism>,
    pub timestamp: DateTime<Utc>,
}

impl Log {
    pub fn started(input: Value, max_retries: u32, retry_mechanism: RetryMechanism) -> Self {
        Self {
            status: LogStatus::Started,
            input: Some(input),
            output: None,
            max_retries: Some(max_retries),
            retry_mechanism: Some(retry_mechanism),
            timestamp: Utc::now(),
        }
    }

    pub fn completed(output: Value) -> Self {
        Self {
            status: LogStatus::Completed,
            input: None,
            output: Some(output),
            max_retries: None,
            retry_mechanism: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(output: Value) -> Self {
        Self {
            status: LogStatus::Failed,
            input: None,
            output: Some(output),
            max_retries: None,
            retry_mechanism: None,
            timestamp: Utc::now(),
        }
    }
}

/// Normalized engine reply. `status_code` reflects the HTTP status regardless of
/// whether it was a success or error response — the caller dispatches on it.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineResponse {
    pub status_code: u16,
    pub payload: BTreeMap<String, Value>,
}

impl EngineResponse {
    pub fn payload_value(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}
