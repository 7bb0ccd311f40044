//! Binds a plain async function to a registrable, introspectable workflow.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::context::WorkflowContext;
use crate::descriptor::{Describe, TypeDescriptor};
use crate::error::EndureError;

// `u8` already rules out negative values, so this isn't an active check —
// kept as a named constant purely so `InvalidRetention`'s message states the
// full `[0, 30]` range rather than a bare `30`.
const MIN_RETENTION_DAYS: u8 = 0;
const MAX_RETENTION_DAYS: u8 = 30;
const DEFAULT_RETENTION_DAYS: u8 = 7;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("service name must not be empty")]
    InvalidArgument,
    #[error("workflow '{0}' is already registered in this service")]
    DuplicateWorkflow(String),
    #[error("retention_days must be between {MIN_RETENTION_DAYS} and {MAX_RETENTION_DAYS}, got {0}")]
    InvalidRetention(u8),
}

/// Error surfaced by a workflow invocation, one variant per row of the
/// handler contract's error-mapping table.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Raw request envelope was malformed (missing `execution_id`/`input`).
    #[error("{0}")]
    BadRequest(String),
    /// The input JSON didn't convert into the workflow's declared input type.
    #[error("input failed validation: {0}")]
    Validation(Value),
    /// The user function, or the action executor beneath it, raised a
    /// pre-classified error with its own status code.
    #[error(transparent)]
    Endure(#[from] EndureError),
    /// The action executor reported a retryable/transport/protocol failure.
    #[error(transparent)]
    Action(#[from] crate::context::ExecuteActionError),
    /// Anything else the user function returned.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<WorkflowError> for EndureError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::BadRequest(message) => EndureError::new(400, "Value error")
                .with_details(serde_json::json!({ "details": message })),
            WorkflowError::Validation(details) => EndureError::new(422, "Validation error").with_details(details),
            WorkflowError::Endure(err) => err,
            WorkflowError::Action(action_err) => map_execute_action_error(action_err),
            WorkflowError::Other(err) => {
                EndureError::new(500, "Internal server error").with_details(serde_json::json!({ "details": err.to_string() }))
            }
        }
    }
}

fn map_execute_action_error(err: crate::context::ExecuteActionError) -> EndureError {
    use crate::context::ExecuteActionError as E;
    match err {
        E::Invalid(message) => EndureError::value_error(message),
        E::Endure(endure) => endure,
        E::Transport(transport) => EndureError::new(500, transport.to_string()),
        E::Protocol(detail) => EndureError::new(500, "Internal server error")
            .with_details(serde_json::json!({ "details": detail })),
        // The host already gave up on the inbound request; the status here
        // is never read by anyone, but 499 ("Client Closed Request") is the
        // recognizable nginx-idiom code for it.
        E::Cancelled => EndureError::new(499, "Request cancelled"),
    }
}

type HandlerFuture<O> = Pin<Box<dyn Future<Output = Result<O, WorkflowError>> + Send>>;

/// A registered workflow: a function from `(WorkflowContext, I)` to `O`, plus
/// the metadata the discovery endpoint and registry need.
pub struct Workflow<I, O> {
    name: String,
    retention_days: u8,
    handler: Arc<dyn Fn(WorkflowContext, I) -> HandlerFuture<O> + Send + Sync>,
}

impl<I, O> Workflow<I, O>
where
    I: DeserializeOwned + Describe + Send + 'static,
    O: Serialize + Describe + Send + 'static,
{
    /// `handler` must accept exactly `(WorkflowContext, I)` and return
    /// `Result<O, WorkflowError>` — the signature the source spec validates
    /// at registration time. Here the compiler is that check: no value of
    /// the wrong shape can be passed in the first place.
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(WorkflowContext, I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, WorkflowError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            retention_days: DEFAULT_RETENTION_DAYS,
            handler: Arc::new(move |ctx, input| Box::pin(handler(ctx, input))),
        }
    }

    pub fn retention_days(mut self, days: u8) -> Result<Self, RegistryError> {
        if days > MAX_RETENTION_DAYS {
            return Err(RegistryError::InvalidRetention(days));
        }
        self.retention_days = days;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<I, O> Workflow<I, O>
where
    I: DeserializeOwned + Describe + Send + Sync + 'static,
    O: Serialize + Describe + Send + Sync + 'static,
{
    pub fn into_any(self) -> Arc<dyn AnyWorkflow> {
        Arc::new(self)
    }
}

/// Metadata about a registered workflow, as reported by `/discover`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct WorkflowMeta {
    pub name: String,
    pub input: TypeDescriptor,
    pub output: TypeDescriptor,
    pub idem_retention: u8,
}

/// Type-erased workflow interface used by the registry and the HTTP binding,
/// so both can operate over heterogeneous `Workflow<I, O>` instances without
/// knowing their concrete `I`/`O` types.
#[async_trait]
pub trait AnyWorkflow: Send + Sync {
    fn meta(&self) -> WorkflowMeta;

    async fn invoke(&self, ctx: WorkflowContext, input: Value) -> Result<Value, WorkflowError>;
}

#[async_trait]
impl<I, O> AnyWorkflow for Workflow<I, O>
where
    I: DeserializeOwned + Describe + Send + Sync + 'static,
    O: Serialize + Describe + Send + Sync + 'static,
{
    fn meta(&self) -> WorkflowMeta {
        WorkflowMeta {
            name: self.name.clone(),
            input: I::describe(),
            output: O::describe(),
            idem_retention: self.retention_days,
        }
    }

    async fn invoke(&self, ctx: WorkflowContext, input: Value) -> Result<Value, WorkflowError> {
        let typed_input: I = serde_json::from_value(input).map_err(|err| {
            WorkflowError::Validation(serde_json::json!({ "error": err.to_string() }))
        })?;
        let output = (self.handler)(ctx, typed_input).await?;
        serde_json::to_value(output)
            .map_err(|err| WorkflowError::Other(anyhow::anyhow!("output is not serializable: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::EngineClient;
    use crate::config::EngineClientConfig;

    fn noop_context() -> WorkflowContext {
        let engine = EngineClient::new(EngineClientConfig::with_base_url("http://example.invalid")).unwrap();
        WorkflowContext::new("exec-1", Arc::new(engine))
    }

    #[test]
    fn retention_days_rejects_values_above_thirty() {
        let workflow: Workflow<String, String> = Workflow::new("echo", |_ctx, input| async move { Ok(input) });
        let err = workflow.retention_days(31).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidRetention(31)));
    }

    #[test]
    fn retention_days_accepts_boundary_values() {
        let workflow: Workflow<String, String> = Workflow::new("echo", |_ctx, input| async move { Ok(input) });
        assert!(workflow.retention_days(0).is_ok());
        let workflow: Workflow<String, String> = Workflow::new("echo", |_ctx, input| async move { Ok(input) });
        assert!(workflow.retention_days(30).is_ok());
    }

    #[tokio::test]
    async fn invoke_deserializes_input_and_serializes_output() {
        let workflow: Workflow<String, String> =
            Workflow::new("greet", |_ctx, name: String| async move { Ok(format!("Hello, {name}!")) });
        let any: Arc<dyn AnyWorkflow> = workflow.into_any();
        let output = any
            .invoke(noop_context(), serde_json::json!("Alice"))
            .await
            .unwrap();
        assert_eq!(output, serde_json::json!("Hello, Alice!"));
    }

    #[tokio::test]
    async fn invoke_reports_validation_error_on_bad_input_shape() {
        #[derive(serde::Deserialize)]
        struct OrderInput {
            #[allow(dead_code)]
            amount: u64,
        }
        impl Describe for OrderInput {
            fn describe() -> TypeDescriptor {
                TypeDescriptor::primitive("OrderInput")
            }
        }
        let workflow: Workflow<OrderInput, String> =
            Workflow::new("process_order", |_ctx, _input| async move { Ok("ok".to_string()) });
        let any: Arc<dyn AnyWorkflow> = workflow.into_any();
        let result = any.invoke(noop_context(), serde_json::json!({})).await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn workflow_error_maps_to_endure_error_status_codes() {
        let bad_request: EndureError = WorkflowError::BadRequest("missing field".into()).into();
        assert_eq!(bad_request.status_code, 400);

        let validation: EndureError = WorkflowError::Validation(serde_json::json!({})).into();
        assert_eq!(validation.status_code, 422);

        let other: EndureError = WorkflowError::Other(anyhow::anyhow!("boom")).into();
        assert_eq!(other.status_code, 500);

        let cancelled: EndureError =
            WorkflowError::Action(crate::context::ExecuteActionError::Cancelled).into();
        assert_eq!(cancelled.status_code, 499);
    }
}
