//! The single error shape that crosses from the executor/registry layer into
//! an HTTP response, mirroring the source SDK's `EndureException(status_code,
//! output)` — a status code plus a JSON-friendly payload, not a string.

use serde_json::Value;

/// An error the workflow-handler layer knows how to turn directly into an
/// HTTP response: a status code chosen by the raiser, and a JSON payload.
#[derive(Debug, Clone, thiserror::Error)]
#[error("endure error {status_code}: {message}")]
pub struct EndureError {
    pub status_code: u16,
    pub message: String,
    pub details: Option<Value>,
}

impl EndureError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// The engine reported the action as un-retryable after a failed attempt
    /// (400/404 from a FAILED acknowledgment); mapped to 500 regardless of
    /// the engine's own status, matching the protocol's chosen wording.
    pub fn exhausted() -> Self {
        Self::new(500, "Action failed after reaching max retries")
    }

    /// The engine answered 409 to a FAILED acknowledgment: the execution
    /// itself has been paused or terminated out from under this action.
    pub fn paused_or_terminated() -> Self {
        Self::new(409, "Execution paused or terminated")
    }

    pub fn value_error(details: impl Into<String>) -> Self {
        Self::new(400, "Value error").with_details(serde_json::json!({ "details": details.into() }))
    }

    pub fn validation_error(details: Value) -> Self {
        Self::new(422, "Validation error").with_details(details)
    }

    /// Output payload as the handler contract's response body expects it:
    /// `{"output": {"error": ..., "details"?: ...}}`.
    pub fn output(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("error".to_string(), Value::String(self.message.clone()));
        if let Some(details) = &self.details {
            map.insert("details".to_string(), details.clone());
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_maps_to_500_with_fixed_message() {
        let err = EndureError::exhausted();
        assert_eq!(err.status_code, 500);
        assert_eq!(err.output()["error"], "Action failed after reaching max retries");
    }

    #[test]
    fn paused_or_terminated_preserves_409() {
        let err = EndureError::paused_or_terminated();
        assert_eq!(err.status_code, 409);
    }

    #[test]
    fn value_error_nests_details_under_output() {
        let err = EndureError::value_error("amount must be positive");
        let output = err.output();
        assert_eq!(output["error"], "Value error");
        assert_eq!(output["details"]["details"], "amount must be positive");
    }
}
