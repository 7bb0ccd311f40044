//! Turns a registered [`Workflow`] into an axum handler: parses the request
//! envelope, marks the execution as running, invokes the workflow, and maps
//! any error onto the canonical `{"output": {...}}` response shape.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{post, MethodRouter};
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::client::EngineClient;
use crate::context::WorkflowContext;
use crate::error::EndureError;
use crate::workflow::{AnyWorkflow, WorkflowError};

/// `POST /execute/{service}/{workflow}` request body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExecuteRequest {
    pub execution_id: String,
    #[schema(value_type = Object)]
    pub input: Value,
}

impl IntoResponse for EndureError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(serde_json::json!({ "output": self.output() }))).into_response()
    }
}

/// Builds the `POST` route for one workflow, closing over its engine client
/// handle and the workflow itself.
///
/// The body is taken as raw bytes and parsed by hand rather than via axum's
/// `Json<ExecuteRequest>` extractor, so a malformed or incomplete envelope
/// produces the handler contract's `{"output": {"error": ...}}` shape (step 1
/// of the contract) instead of axum's own rejection body.
///
/// If the host application inserts a request-scoped `Extension<CancellationToken>`
/// (e.g. a middleware layer that cancels it on client disconnect), that token
/// drives this execution's `WorkflowContext`; otherwise a fresh token is used
/// that nothing outside this handler can ever trigger.
pub fn route(workflow: Arc<dyn AnyWorkflow>, engine: Arc<EngineClient>) -> MethodRouter {
    post(
        move |cancellation: Option<Extension<CancellationToken>>, body: Bytes| {
            let workflow = workflow.clone();
            let engine = engine.clone();
            async move {
                let cancellation = cancellation.map(|Extension(token)| token).unwrap_or_default();
                match parse_request(&body) {
                    Ok(request) => execute(workflow, engine, request, cancellation).await,
                    Err(err) => err.into_response(),
                }
            }
        },
    )
}

/// Parses the raw body per the handler contract's step 1: it must be a JSON
/// object containing at least `execution_id` (string) and `input` (any).
fn parse_request(body: &[u8]) -> Result<ExecuteRequest, EndureError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| EndureError::value_error("Request body must be valid JSON"))?;
    let Value::Object(mut map) = value else {
        return Err(EndureError::value_error("Request body must be a JSON object"));
    };
    let execution_id = match map.remove("execution_id") {
        Some(Value::String(id)) => id,
        _ => {
            return Err(EndureError::value_error(
                "Request must include 'execution_id' and 'input' fields",
            ))
        }
    };
    let Some(input) = map.remove("input") else {
        return Err(EndureError::value_error(
            "Request must include 'execution_id' and 'input' fields",
        ));
    };
    Ok(ExecuteRequest { execution_id, input })
}

async fn execute(
    workflow: Arc<dyn AnyWorkflow>,
    engine: Arc<EngineClient>,
    request: ExecuteRequest,
    cancellation: CancellationToken,
) -> Response {
    if request.execution_id.is_empty() {
        return EndureError::value_error("execution_id must be provided").into_response();
    }

    if let Err(err) = engine.mark_execution_as_running(&request.execution_id).await {
        error!(execution_id = %request.execution_id, %err, "failed to mark execution as running");
        return EndureError::new(500, err.to_string()).into_response();
    }

    let ctx = WorkflowContext::new(request.execution_id.clone(), engine).with_cancellation(cancellation);
    match workflow.invoke(ctx, request.input).await {
        Ok(output) => {
            info!(execution_id = %request.execution_id, "workflow completed");
            (StatusCode::OK, Json(serde_json::json!({ "output": output }))).into_response()
        }
        Err(err) => {
            let endure: EndureError = map_workflow_error(err);
            endure.into_response()
        }
    }
}

fn map_workflow_error(err: WorkflowError) -> EndureError {
    err.into()
}
