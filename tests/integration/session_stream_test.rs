//! Session Stream Integration Tests
//!
//! Whole turns through `SessionOrchestrator`, driven by recorded transcripts
//! and small in-test backends for failure and cancellation paths.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use mint_ai::models::plan::PlanStatus;
use mint_ai::models::session::{InputStatus, SessionNotice, UsageReport};
use mint_ai::models::workspace::{ProjectFile, ProjectOutput};
use mint_ai::services::session::{SessionOrchestrator, UsageRecorder};
use mint_ai::utils::error::SessionError;
use mint_ai_core::SessionMode;
use mint_ai_llm::{
    ByteStream, GenerationBackend, GenerationRequest, LlmError, LlmResult, ReplayBackend,
    RetryPolicy,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn record(event: &str, data: serde_json::Value) -> String {
    format!("event: {event}\ndata: {data}\n\n")
}

fn no_wait_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO, Duration::ZERO)
}

/// Emits `chunks` and then never ends.
struct StallingBackend {
    chunks: Vec<String>,
}

#[async_trait]
impl GenerationBackend for StallingBackend {
    fn name(&self) -> &'static str {
        "stalling"
    }

    async fn open_stream(&self, _request: &GenerationRequest) -> LlmResult<ByteStream> {
        let items: Vec<LlmResult<Bytes>> = self
            .chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.clone())))
            .collect();
        Ok(Box::pin(
            futures_util::StreamExt::chain(stream::iter(items), stream::pending()),
        ))
    }
}

/// Fails the first `failures` opens with `error`, then replays `transcript`.
struct FlakyBackend {
    failures: u32,
    error: LlmError,
    attempts: AtomicU32,
    transcript: String,
}

#[async_trait]
impl GenerationBackend for FlakyBackend {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn open_stream(&self, request: &GenerationRequest) -> LlmResult<ByteStream> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(self.error.clone());
        }
        ReplayBackend::from_transcript(&self.transcript, 16)
            .open_stream(request)
            .await
    }
}

#[derive(Default)]
struct RecordingUsage {
    calls: Mutex<Vec<(Option<String>, UsageReport)>>,
}

#[async_trait]
impl UsageRecorder for RecordingUsage {
    async fn record(&self, chat_id: Option<&str>, usage: &UsageReport) {
        self.calls
            .lock()
            .unwrap()
            .push((chat_id.map(str::to_string), usage.clone()));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_code_chunk_scenario_yields_project_output() {
    let transcript = "event: code-chunk\ndata: {\"content\":\"```file:a.ts\\nconst x=1;\\n```\"}\n\nevent: done\ndata: {}\n\n";
    let backend = Arc::new(ReplayBackend::from_transcript(transcript, 5));
    let mut session = SessionOrchestrator::new(backend);

    let outcome = session
        .send_message("write a.ts", &CancellationToken::new())
        .await
        .unwrap();
    let summary = outcome.summary().unwrap();
    assert_eq!(
        summary.output,
        Some(ProjectOutput::Project {
            files: vec![ProjectFile {
                path: "a.ts".to_string(),
                content: "const x=1;".to_string(),
                language: "typescript".to_string(),
            }]
        })
    );
    assert_eq!(session.workspace().file("a.ts"), Some("const x=1;"));
    assert_eq!(session.status(), InputStatus::Ready);
}

#[tokio::test]
async fn test_done_code_replaces_streamed_code() {
    let transcript = [
        record("code-chunk", serde_json::json!({"content": "```file:a.ts\ndraft\n```"})),
        record(
            "done",
            serde_json::json!({"code": "```file:a.ts\nfinal\n```\n```file:b.ts\nextra\n```"}),
        ),
    ]
    .concat();
    let backend = Arc::new(ReplayBackend::from_transcript(&transcript, 9));
    let mut session = SessionOrchestrator::new(backend);
    session
        .send_message("go", &CancellationToken::new())
        .await
        .unwrap();

    let ws = session.workspace();
    assert_eq!(ws.file("a.ts"), Some("final"));
    assert_eq!(ws.file("b.ts"), Some("extra"));
    // Both applies belong to one turn, so the base is the empty pre-turn state.
    assert!(ws.base_files.as_ref().unwrap().is_empty());
}

#[tokio::test]
async fn test_notices_follow_stream_order() {
    let transcript = [
        record("explanation-chunk", serde_json::json!({"content": "<question id=\"q1\">Dark mode?</question>"})),
        record("explanation-chunk", serde_json::json!({"content": "<plan title=\"Site\"><step id=\"1\">Build it</step></plan>"})),
        record("done", serde_json::json!({"chatId": "chat-9"})),
    ]
    .concat();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let backend = Arc::new(ReplayBackend::from_transcript(&transcript, 11));
    let mut session = SessionOrchestrator::new(backend)
        .with_mode(SessionMode::Plan)
        .with_notices(tx);

    session
        .send_message("plan a site", &CancellationToken::new())
        .await
        .unwrap();

    let mut statuses = Vec::new();
    let mut completed = false;
    while let Ok(notice) = rx.try_recv() {
        match notice {
            SessionNotice::PlanUpdated(plan) => statuses.push(plan.status),
            SessionNotice::TurnCompleted { .. } => completed = true,
            other => panic!("unexpected notice {other:?}"),
        }
    }
    assert!(completed);
    assert_eq!(statuses.first(), Some(&PlanStatus::Questioning));
    assert_eq!(statuses.last(), Some(&PlanStatus::Questioning));

    session.answer_question("q1", "yes").unwrap();
    let approved = session.approve_plan().unwrap();
    assert_eq!(approved.status, PlanStatus::Approved);
    assert_eq!(session.chat_id(), Some("chat-9"));
}

#[tokio::test]
async fn test_usage_is_recorded_with_chat_id() {
    let transcript = record(
        "done",
        serde_json::json!({"chatId": "c-1", "cost": 0.02, "tokens": "1200"}),
    );
    let usage = Arc::new(RecordingUsage::default());
    let backend = Arc::new(ReplayBackend::from_transcript(&transcript, 64));
    let mut session = SessionOrchestrator::new(backend).with_usage_recorder(usage.clone());

    session
        .send_message("hi", &CancellationToken::new())
        .await
        .unwrap();

    let calls = usage.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0.as_deref(), Some("c-1"));
    assert_eq!(calls[0].1.cost.as_deref(), Some("0.02"));
    assert_eq!(calls[0].1.token_count(), 1200);
}

#[tokio::test]
async fn test_cancel_mid_stream_keeps_applied_files() {
    let transcript = [
        record("explanation-chunk", serde_json::json!({"content": "Working on it"})),
        record("code-chunk", serde_json::json!({"content": "```file:a.ts\nkept\n```\n```file:b.ts\npart"})),
    ]
    .concat();
    let backend = Arc::new(StallingBackend {
        chunks: vec![transcript],
    });
    let mut session = SessionOrchestrator::new(backend);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let outcome = session.send_message("go", &cancel).await.unwrap();
    assert!(outcome.is_cancelled());
    assert_eq!(session.status(), InputStatus::Ready);
    assert_eq!(session.workspace().file("a.ts"), Some("kept"));
    assert_eq!(session.workspace().file("b.ts"), None);
    assert_eq!(session.messages().last().unwrap().content, "Working on it");
}

#[tokio::test]
async fn test_transient_open_failures_are_retried() {
    let backend = Arc::new(FlakyBackend {
        failures: 2,
        error: LlmError::network("connection reset"),
        attempts: AtomicU32::new(0),
        transcript: record("done", serde_json::json!({})),
    });
    let mut session =
        SessionOrchestrator::new(backend.clone()).with_retry_policy(no_wait_retry());

    let outcome = session
        .send_message("hi", &CancellationToken::new())
        .await
        .unwrap();
    assert!(!outcome.is_cancelled());
    assert_eq!(backend.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_validation_failure_is_not_retried() {
    let backend = Arc::new(FlakyBackend {
        failures: 5,
        error: LlmError::InvalidRequest {
            message: "HTTP 422: bad mode".to_string(),
        },
        attempts: AtomicU32::new(0),
        transcript: String::new(),
    });
    let mut session =
        SessionOrchestrator::new(backend.clone()).with_retry_policy(no_wait_retry());

    let err = session
        .send_message("hi", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::Backend(LlmError::InvalidRequest { .. })
    ));
    assert_eq!(backend.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(session.status(), InputStatus::Error);
    assert_eq!(session.messages().len(), 1);

    // An errored session accepts the next turn.
    assert!(!session.status().is_busy());
}
