//! Drives the full `EngineClient` + `WorkflowContext` stack against a fake
//! durable execution engine, covering the end-to-end scenarios the protocol
//! is built to satisfy.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use endure_sdk::{ActionError, EngineClient, EngineClientConfig, ExecuteActionError, RetryMechanism, WorkflowContext};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn context_against(server: &MockServer, execution_id: &str) -> WorkflowContext {
    let engine = EngineClient::new(EngineClientConfig::with_base_url(server.uri())).unwrap();
    WorkflowContext::new(execution_id, Arc::new(engine))
}

/// Scenario 1: happy path — STARTED (201) then COMPLETED (200), two logs total.
#[tokio::test]
async fn happy_path_greets_and_sends_two_logs() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/executions/e1/log/greet"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let ctx = context_against(&server, "e1").await;
    let result: String = ctx
        .execute_action(
            Some("greet"),
            |name: String| async move { Ok(format!("Hello, {name}!")) },
            "Alice".to_string(),
            3,
            RetryMechanism::Exponential,
        )
        .await
        .unwrap();

    assert_eq!(result, "Hello, Alice!");
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let started: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(started["status"], "started");
    assert_eq!(started["input"], "Alice");
    let completed: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(completed["status"], "completed");
    assert_eq!(completed["output"], "Hello, Alice!");
}

/// Scenario 2: cached replay — a 208 on STARTED returns the cached output and
/// sends exactly one log; the action callable is never invoked.
#[tokio::test]
async fn cached_replay_returns_prior_output_without_reinvoking() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/executions/e2/log/greet"))
        .respond_with(ResponseTemplate::new(208).set_body_json(serde_json::json!({"output": {"result": 42}})))
        .mount(&server)
        .await;

    let ctx = context_against(&server, "e2").await;
    let invocations = Arc::new(AtomicU32::new(0));
    let counter = invocations.clone();
    let result: serde_json::Value = ctx
        .execute_action(
            Some("greet"),
            move |_input: serde_json::Value| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok(serde_json::json!({"result": 0})) }
            },
            serde_json::json!({}),
            3,
            RetryMechanism::Constant,
        )
        .await
        .unwrap();

    assert_eq!(result, serde_json::json!({"result": 42}));
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

/// Scenario 3: retry then succeed — fails once, succeeds on the second
/// attempt, observing the engine's `retry_at` sleep; three logs total.
#[tokio::test]
async fn retry_then_succeed_sleeps_for_the_engines_retry_at() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/executions/e3/log/flaky"))
        .respond_with(ResponseTemplate::new(201))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    let retry_at = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs_f64() + 0.01;
    Mock::given(method("PATCH"))
        .and(path("/executions/e3/log/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"retry_at": retry_at})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/executions/e3/log/flaky"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let ctx = context_against(&server, "e3").await;
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();
    let result: serde_json::Value = ctx
        .execute_action(
            Some("flaky"),
            move |_input: serde_json::Value| {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(ActionError::Failed(anyhow::anyhow!("transient glitch")))
                    } else {
                        Ok(serde_json::json!({"ok": true}))
                    }
                }
            },
            serde_json::json!({}),
            3,
            RetryMechanism::Exponential,
        )
        .await
        .unwrap();

    assert_eq!(result, serde_json::json!({"ok": true}));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

/// Scenario 4: exhausted retries — the engine answers a FAILED ack with 400,
/// which maps to a 500 "Action failed after reaching max retries" error.
#[tokio::test]
async fn exhausted_retries_surfaces_as_endure_500() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/executions/e4/log/flaky"))
        .respond_with(ResponseTemplate::new(201))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    let retry_at = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs_f64();
    Mock::given(method("PATCH"))
        .and(path("/executions/e4/log/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"retry_at": retry_at})))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/executions/e4/log/flaky"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let ctx = context_against(&server, "e4").await;
    let result: Result<serde_json::Value, _> = ctx
        .execute_action(
            Some("flaky"),
            |_input: serde_json::Value| async move { Err(ActionError::Failed(anyhow::anyhow!("always fails"))) },
            serde_json::json!({}),
            3,
            RetryMechanism::Linear,
        )
        .await;

    match result {
        Err(ExecuteActionError::Endure(err)) => {
            assert_eq!(err.status_code, 500);
            assert_eq!(err.output()["error"], "Action failed after reaching max retries");
        }
        other => panic!("expected an exhausted-retries Endure error, got {other:?}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

/// Scenario 5: an `Invalid` action error (the ValueError-equivalent) is
/// logged FAILED exactly once and re-raised unchanged, with no retry.
#[tokio::test]
async fn invalid_action_error_is_logged_once_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/executions/e5/log/validate"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let ctx = context_against(&server, "e5").await;
    let result: Result<serde_json::Value, _> = ctx
        .execute_action(
            Some("validate"),
            |_input: serde_json::Value| async move { Err(ActionError::invalid("amount must be positive")) },
            serde_json::json!({"amount": -1}),
            3,
            RetryMechanism::Constant,
        )
        .await;

    assert!(matches!(result, Err(ExecuteActionError::Invalid(_))));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

/// Boundary: a non-JSON success body normalizes to an empty payload instead
/// of failing the call outright.
#[tokio::test]
async fn non_json_engine_body_normalizes_to_empty_payload() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/executions/e6/log/noop"))
        .respond_with(ResponseTemplate::new(201).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let ctx = context_against(&server, "e6").await;
    let result: serde_json::Value = ctx
        .execute_action(
            Some("noop"),
            |input: serde_json::Value| async move { Ok(input) },
            serde_json::json!({"x": 1}),
            0,
            RetryMechanism::Constant,
        )
        .await
        .unwrap();
    assert_eq!(result, serde_json::json!({"x": 1}));
}

/// Boundary: a 409 after a FAILED log means the execution itself was paused
/// or terminated out from under the action — no further retries.
#[tokio::test]
async fn engine_409_after_failed_log_stops_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/executions/e7/log/flaky"))
        .respond_with(ResponseTemplate::new(201))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/executions/e7/log/flaky"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let ctx = context_against(&server, "e7").await;
    let result: Result<serde_json::Value, _> = ctx
        .execute_action(
            Some("flaky"),
            |_input: serde_json::Value| async move { Err(ActionError::Failed(anyhow::anyhow!("transient"))) },
            serde_json::json!({}),
            5,
            RetryMechanism::Exponential,
        )
        .await;

    match result {
        Err(ExecuteActionError::Endure(err)) => assert_eq!(err.status_code, 409),
        other => panic!("expected a paused-or-terminated Endure error, got {other:?}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
