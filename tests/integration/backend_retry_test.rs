//! HTTP Backend Retry Integration Tests
//!
//! Runs turns against a wiremock server standing in for the generation
//! endpoint.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mint_ai::models::session::InputStatus;
use mint_ai::services::session::SessionOrchestrator;
use mint_ai::utils::error::SessionError;
use mint_ai_llm::{HttpGenerationBackend, LlmError, RetryPolicy};

const SSE_BODY: &str = concat!(
    "event: explanation-chunk\n",
    "data: {\"content\":\"Done.\"}\n\n",
    "event: code-chunk\n",
    "data: {\"content\":\"```file:index.html\\n<h1>hi</h1>\\n```\"}\n\n",
    "event: done\n",
    "data: {\"chatId\":\"srv-1\"}\n\n",
);

fn session_for(server: &MockServer) -> SessionOrchestrator {
    let backend =
        HttpGenerationBackend::new(&server.uri(), "/api/generate", Duration::from_secs(5)).unwrap();
    SessionOrchestrator::new(Arc::new(backend)).with_retry_policy(RetryPolicy::new(
        3,
        Duration::from_millis(1),
        Duration::from_millis(5),
    ))
}

fn sse_ok() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_raw(SSE_BODY, "text/event-stream")
}

#[tokio::test]
async fn test_server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({"message": "build it", "mode": "build"})))
        .respond_with(sse_ok())
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let outcome = session
        .send_message("build it", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.summary().unwrap().message.content, "Done.");
    assert_eq!(session.workspace().file("index.html"), Some("<h1>hi</h1>"));
    assert_eq!(session.chat_id(), Some("srv-1"));
    server.verify().await;
}

#[tokio::test]
async fn test_client_errors_fail_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(422).set_body_string("unknown mode"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let err = session
        .send_message("build it", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Backend(LlmError::InvalidRequest { .. })
    ));
    assert_eq!(session.status(), InputStatus::Error);
    assert!(session.last_error().unwrap().contains("422"));
    server.verify().await;
}

#[tokio::test]
async fn test_exhausted_retries_surface_last_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .expect(3)
        .mount(&server)
        .await;

    let mut session = session_for(&server);
    let err = session
        .send_message("build it", &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Backend(LlmError::ServerError {
            status: Some(503),
            ..
        })
    ));
    server.verify().await;
}
