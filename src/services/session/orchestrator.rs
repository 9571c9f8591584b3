//! Session Stream Orchestrator
//!
//! Drives one turn at a time:
//!
//! ```text
//! Ready -> Submitting -> Streaming -> Ready | Error
//! ```
//!
//! The initial request goes through the bounded retry policy. Once the
//! stream is open, records are decoded in arrival order and each event
//! updates its own slice of turn state: thinking records, the assistant
//! message, the plan parser, or the code accumulator that feeds the
//! workspace reconciler.

use std::sync::Arc;

use futures_util::StreamExt;
use mint_ai_core::{DonePayload, SessionMode, SessionStreamEvent, SkillCapability, SkillDescriptor};
use mint_ai_llm::{
    retry_with_backoff, ByteStream, GenerationBackend, GenerationRequest, LlmResult, RetryPolicy,
    SseDecoder, SseRecord,
};
use mint_ai_quality_gates::{CodeQualityChecker, StaticAnalysisChecker};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::skills::SkillRegistry;
use super::usage::{SessionUsageLedger, UsageRecorder};
use crate::models::plan::{ExecutionPlan, PlanStatus};
use crate::models::session::{
    ChatMessage, InputStatus, SessionNotice, ThinkingRecord, TurnOutcome, TurnSummary, UsageReport,
};
use crate::models::settings::AppConfig;
use crate::models::workspace::{FileDiffSummary, ProjectOutput, WorkspaceState};
use crate::services::plan_mode::{PlanStreamParser, DEFAULT_BUFFER_WINDOW};
use crate::services::workspace::{parse_project_output, placeholder_path, WorkspaceResult};
use crate::utils::error::{AppError, AppResult, SessionError};

/// Per-turn state, dropped when the turn ends.
struct TurnState {
    assistant_idx: usize,
    code: String,
    last_applied: Option<ProjectOutput>,
    plan_parser: Option<PlanStreamParser>,
    /// Active skill lacks `write_files`
    skill_blocks_writes: bool,
    write_suppression_logged: bool,
    /// A plan step was activated for this Build-mode turn
    executing_step: bool,
}

enum Flow {
    Continue,
    Done(DonePayload),
    Abort(String),
}

pub struct SessionOrchestrator {
    backend: Arc<dyn GenerationBackend>,
    retry: RetryPolicy,
    quality: Option<Arc<dyn CodeQualityChecker>>,
    usage: Arc<dyn UsageRecorder>,
    skills: SkillRegistry,
    plan_window: usize,
    mode: SessionMode,

    messages: Vec<ChatMessage>,
    thinking: Vec<ThinkingRecord>,
    status: InputStatus,
    active_skill: Option<SkillDescriptor>,
    plan: Option<Arc<ExecutionPlan>>,
    chat_id: Option<String>,
    last_error: Option<String>,
    generation: u64,

    workspace_tx: watch::Sender<Arc<WorkspaceState>>,
    notices: Option<mpsc::UnboundedSender<SessionNotice>>,
}

impl SessionOrchestrator {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        let (workspace_tx, _) = watch::channel(Arc::new(WorkspaceState::new()));
        Self {
            backend,
            retry: RetryPolicy::default(),
            quality: Some(Arc::new(StaticAnalysisChecker::new())),
            usage: Arc::new(SessionUsageLedger::new()),
            skills: SkillRegistry::new(),
            plan_window: DEFAULT_BUFFER_WINDOW,
            mode: SessionMode::default(),
            messages: Vec::new(),
            thinking: Vec::new(),
            status: InputStatus::Ready,
            active_skill: None,
            plan: None,
            chat_id: None,
            last_error: None,
            generation: 0,
            workspace_tx,
            notices: None,
        }
    }

    /// Orchestrator configured from application settings.
    pub fn from_config(backend: Arc<dyn GenerationBackend>, config: &AppConfig) -> Self {
        Self::new(backend)
            .with_retry_policy(config.retry.to_policy())
            .with_plan_window(config.plan_buffer_window)
            .with_mode(config.default_mode)
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// `None` disables the advisory quality check.
    pub fn with_quality_checker(mut self, checker: Option<Arc<dyn CodeQualityChecker>>) -> Self {
        self.quality = checker;
        self
    }

    pub fn with_usage_recorder(mut self, recorder: Arc<dyn UsageRecorder>) -> Self {
        self.usage = recorder;
        self
    }

    pub fn with_skill_registry(mut self, registry: SkillRegistry) -> Self {
        self.skills = registry;
        self
    }

    pub fn with_plan_window(mut self, window: usize) -> Self {
        self.plan_window = window;
        self
    }

    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_workspace(self, workspace: WorkspaceState) -> Self {
        self.workspace_tx.send_replace(Arc::new(workspace));
        self
    }

    pub fn with_notices(mut self, tx: mpsc::UnboundedSender<SessionNotice>) -> Self {
        self.notices = Some(tx);
        self
    }

    // ── Read-only state ────────────────────────────────────────────────

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn thinking(&self) -> &[ThinkingRecord] {
        &self.thinking
    }

    pub fn status(&self) -> InputStatus {
        self.status
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SessionMode) {
        self.mode = mode;
    }

    pub fn active_skill(&self) -> Option<&SkillDescriptor> {
        self.active_skill.as_ref()
    }

    pub fn plan(&self) -> Option<Arc<ExecutionPlan>> {
        self.plan.clone()
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn skills(&self) -> &SkillRegistry {
        &self.skills
    }

    pub fn skills_mut(&mut self) -> &mut SkillRegistry {
        &mut self.skills
    }

    /// Latest workspace snapshot.
    pub fn workspace(&self) -> Arc<WorkspaceState> {
        self.workspace_tx.borrow().clone()
    }

    /// Receiver that sees every published workspace snapshot.
    pub fn subscribe_workspace(&self) -> watch::Receiver<Arc<WorkspaceState>> {
        self.workspace_tx.subscribe()
    }

    // ── Turn ───────────────────────────────────────────────────────────

    /// Run one turn to completion, cancellation, or failure.
    pub async fn send_message(
        &mut self,
        text: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, SessionError> {
        if self.status.is_busy() {
            return Err(SessionError::Busy);
        }

        self.generation += 1;
        self.thinking.clear();
        self.active_skill = None;
        self.last_error = None;
        let message = text.into();
        self.messages.push(ChatMessage::user(message.clone()));
        self.messages.push(ChatMessage::assistant_placeholder());
        self.status = InputStatus::Submitting;

        let mut turn = TurnState {
            assistant_idx: self.messages.len() - 1,
            code: String::new(),
            last_applied: None,
            plan_parser: (self.mode == SessionMode::Plan)
                .then(|| PlanStreamParser::with_window(self.plan_window)),
            skill_blocks_writes: false,
            write_suppression_logged: false,
            executing_step: false,
        };

        let (request, started_plan) = self.build_request(message, &mut turn);
        tracing::info!(
            backend = self.backend.name(),
            mode = %self.mode,
            generation = self.generation,
            "starting turn"
        );

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.open_with_retry(&request) => Some(result),
        };
        let stream = match opened {
            None => return Ok(self.cancel_turn(&turn)),
            Some(Ok(stream)) => stream,
            Some(Err(e)) => {
                self.fail_turn(&turn, e.to_string(), false);
                return Err(SessionError::Backend(e));
            }
        };

        if let Some(plan) = started_plan {
            self.publish_plan(plan);
        }
        self.consume_stream(stream, &mut turn, cancel).await
    }

    /// Reset a turn whose future was dropped mid-flight. Partial text and
    /// files already applied are kept.
    pub fn abandon_turn(&mut self) {
        if self.status.is_busy() {
            tracing::warn!("abandoning in-flight turn");
            self.status = InputStatus::Ready;
        }
    }

    /// Build-mode turns on an approved plan start its next step. The started
    /// plan goes out in the request but is only published once the stream
    /// opens, so a cancelled or failed open leaves the step pending.
    fn build_request(
        &self,
        message: String,
        turn: &mut TurnState,
    ) -> (GenerationRequest, Option<ExecutionPlan>) {
        let started = self
            .plan
            .as_deref()
            .filter(|plan| self.mode == SessionMode::Build && plan.status == PlanStatus::Approved)
            .and_then(ExecutionPlan::start_next_step);
        let effective = started.as_ref().or(self.plan.as_deref());
        turn.executing_step = self.mode == SessionMode::Build
            && effective.is_some_and(|plan| plan.active_step().is_some());

        let request = GenerationRequest::new(message, self.mode)
            .with_chat_id(self.chat_id.clone())
            .with_plan_context(effective.map(ExecutionPlan::to_context));
        (request, started)
    }

    async fn open_with_retry(&self, request: &GenerationRequest) -> LlmResult<ByteStream> {
        let backend = &self.backend;
        retry_with_backoff(&self.retry, |attempt| {
            async move {
                if attempt > 0 {
                    tracing::debug!(attempt, "reopening generation stream");
                }
                backend.open_stream(request).await
            }
        })
        .await
    }

    async fn consume_stream(
        &mut self,
        mut stream: ByteStream,
        turn: &mut TurnState,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, SessionError> {
        let mut decoder = SseDecoder::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.cancel_turn(turn)),
                next = stream.next() => next,
            };

            let exhausted = next.is_none();
            let records = match next {
                Some(Ok(bytes)) => {
                    self.status = InputStatus::Streaming;
                    decoder.push(&bytes)
                }
                Some(Err(e)) => {
                    self.fail_turn(turn, e.to_string(), true);
                    return Err(SessionError::Backend(e));
                }
                None => decoder.finish().into_iter().collect(),
            };

            for record in records {
                match self.dispatch(&record, turn) {
                    Flow::Continue => {}
                    Flow::Done(payload) => return Ok(self.complete_turn(payload, turn).await),
                    Flow::Abort(error) => {
                        self.fail_turn(turn, error.clone(), false);
                        return Err(SessionError::StreamAborted(error));
                    }
                }
            }

            if exhausted {
                self.fail_turn(turn, SessionError::StreamClosed.to_string(), true);
                return Err(SessionError::StreamClosed);
            }
        }
    }

    fn dispatch(&mut self, record: &SseRecord, turn: &mut TurnState) -> Flow {
        let event = match record.decode() {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(event = record.event_name(), error = %e, "skipping malformed record");
                return Flow::Continue;
            }
        };

        match event {
            SessionStreamEvent::SkillActivated { skill } => {
                let grant = self.skills.activate(&skill);
                turn.skill_blocks_writes = !grant.allows(SkillCapability::WriteFiles);
                tracing::debug!(skill = %skill.id, writes = !turn.skill_blocks_writes, "skill activated");
                self.active_skill = Some(skill);
            }
            SessionStreamEvent::ThinkingChunk {
                thinking_type,
                content,
            } => match self
                .thinking
                .iter_mut()
                .find(|r| r.thinking_type == thinking_type)
            {
                Some(record) => record.content.push_str(&content),
                None => self.thinking.push(ThinkingRecord {
                    thinking_type,
                    content,
                    is_complete: false,
                }),
            },
            SessionStreamEvent::ThinkingComplete { thinking_type } => {
                match self
                    .thinking
                    .iter_mut()
                    .find(|r| r.thinking_type == thinking_type)
                {
                    Some(record) => record.is_complete = true,
                    None => self.thinking.push(ThinkingRecord {
                        thinking_type,
                        content: String::new(),
                        is_complete: true,
                    }),
                }
            }
            SessionStreamEvent::ExplanationChunk { content } => {
                self.messages[turn.assistant_idx].content.push_str(&content);
                if let Some(parser) = turn.plan_parser.as_mut() {
                    let delta = parser.push(&content);
                    if !delta.is_empty() {
                        if let Some(plan) = parser.snapshot() {
                            self.publish_plan(plan);
                        }
                    }
                }
            }
            SessionStreamEvent::CodeChunk { content } => {
                turn.code.push_str(&content);
                self.apply_code(turn, false);
            }
            SessionStreamEvent::Done(payload) => return Flow::Done(payload),
            SessionStreamEvent::Error { error } => return Flow::Abort(error),
        }
        Flow::Continue
    }

    fn can_write(&self, turn: &TurnState) -> bool {
        self.mode.allows_writes() && !turn.skill_blocks_writes
    }

    /// Re-parse the whole accumulator and apply any newly available output.
    /// At end of turn an incomplete single-file output is accepted.
    fn apply_code(&mut self, turn: &mut TurnState, final_pass: bool) -> Option<ProjectOutput> {
        let parsed = parse_project_output(&turn.code)?;
        let usable = final_pass
            || parsed.complete
            || matches!(parsed.output, ProjectOutput::Project { .. });
        if !usable || turn.last_applied.as_ref() == Some(&parsed.output) {
            return Some(parsed.output);
        }

        if !self.can_write(turn) {
            if !turn.write_suppression_logged {
                tracing::debug!(mode = %self.mode, "workspace writes suppressed for this turn");
                turn.write_suppression_logged = true;
            }
            return Some(parsed.output);
        }

        match self.workspace().apply_output(&parsed.output, self.generation) {
            Ok(next) => {
                self.publish_workspace(next);
                turn.last_applied = Some(parsed.output.clone());
            }
            Err(e) => tracing::warn!(error = %e, "rejected generated output"),
        }
        Some(parsed.output)
    }

    async fn complete_turn(&mut self, payload: DonePayload, turn: &mut TurnState) -> TurnOutcome {
        if let Some(code) = payload.code.as_ref() {
            turn.code = code.clone();
        }
        let output = self.apply_code(turn, true);

        let mut plan = None;
        if let Some(parser) = turn.plan_parser.take() {
            if let Some(finalized) = parser.finalize() {
                self.publish_plan(finalized.clone());
                plan = Some(finalized);
            }
        }
        if turn.executing_step {
            if let Some(current) = self.plan.clone() {
                let next = current.complete_active_step();
                self.publish_plan(next.clone());
                plan = Some(next);
            }
        }

        if self.active_skill.is_none() {
            self.active_skill = payload
                .skill
                .clone()
                .and_then(|value| serde_json::from_value::<SkillDescriptor>(value).ok());
        }

        if let Some(output) = output.as_ref() {
            self.run_quality_check(output).await;
        }

        let usage = UsageReport {
            cost: payload.cost.clone(),
            tokens: payload.tokens.clone(),
        };
        if payload.chat_id.is_some() {
            self.chat_id = payload.chat_id.clone();
        }
        if !usage.is_empty() {
            self.usage.record(self.chat_id.as_deref(), &usage).await;
        }

        self.status = InputStatus::Ready;
        let message = self.messages[turn.assistant_idx].clone();
        self.notify(SessionNotice::TurnCompleted {
            message_id: message.id.clone(),
        });
        tracing::info!(generation = self.generation, "turn completed");

        TurnOutcome::Completed(Box::new(TurnSummary {
            message,
            output,
            plan,
            skill: self.active_skill.clone(),
            usage,
        }))
    }

    /// Advisory only: issues and checker failures are logged.
    async fn run_quality_check(&self, output: &ProjectOutput) {
        let Some(checker) = self.quality.as_ref() else {
            return;
        };
        let files: Vec<(String, &str, &str)> = match output {
            ProjectOutput::Single { content, language } => vec![(
                placeholder_path(language).to_string(),
                content.as_str(),
                language.as_str(),
            )],
            ProjectOutput::Project { files } => files
                .iter()
                .map(|f| (f.path.clone(), f.content.as_str(), f.language.as_str()))
                .collect(),
        };

        for (path, content, language) in files {
            match checker.check(content, language).await {
                Ok(report) => {
                    for issue in &report.issues {
                        tracing::warn!(
                            checker = checker.name(),
                            path = %path,
                            rule = %issue.rule_id,
                            severity = ?issue.severity,
                            line = ?issue.line,
                            "{}",
                            issue.message
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(checker = checker.name(), path = %path, error = %e, "quality check failed")
                }
            }
        }
    }

    fn cancel_turn(&mut self, turn: &TurnState) -> TurnOutcome {
        tracing::info!(generation = self.generation, "turn cancelled");
        if self.messages[turn.assistant_idx].content.is_empty() {
            self.messages.remove(turn.assistant_idx);
        }
        self.status = InputStatus::Ready;
        TurnOutcome::Cancelled
    }

    /// Abort the turn. Workspace changes already applied stand.
    fn fail_turn(&mut self, turn: &TurnState, error: String, keep_partial: bool) {
        tracing::error!(generation = self.generation, error = %error, "turn aborted");
        let partial = !self.messages[turn.assistant_idx].content.is_empty();
        if !(keep_partial && partial) {
            self.messages.remove(turn.assistant_idx);
        }
        self.status = InputStatus::Error;
        self.last_error = Some(error.clone());
        self.notify(SessionNotice::TurnFailed { error });
    }

    // ── Plan operations ────────────────────────────────────────────────

    fn current_plan(&self) -> AppResult<Arc<ExecutionPlan>> {
        self.plan
            .clone()
            .ok_or_else(|| AppError::not_found("No active plan"))
    }

    pub fn answer_question(&mut self, question_id: &str, answer: impl Into<String>) -> AppResult<Arc<ExecutionPlan>> {
        let next = self.current_plan()?.answer_question(question_id, answer)?;
        Ok(self.publish_plan(next))
    }

    pub fn approve_plan(&mut self) -> AppResult<Arc<ExecutionPlan>> {
        let next = self.current_plan()?.approve()?;
        Ok(self.publish_plan(next))
    }

    pub fn skip_step(&mut self, step_id: &str) -> AppResult<Arc<ExecutionPlan>> {
        let next = self.current_plan()?.skip_step(step_id)?;
        Ok(self.publish_plan(next))
    }

    fn publish_plan(&mut self, plan: ExecutionPlan) -> Arc<ExecutionPlan> {
        let plan = Arc::new(plan);
        self.plan = Some(Arc::clone(&plan));
        self.notify(SessionNotice::PlanUpdated(Arc::clone(&plan)));
        plan
    }

    // ── Workspace operations ───────────────────────────────────────────

    fn update_workspace(
        &mut self,
        op: impl FnOnce(&WorkspaceState) -> WorkspaceResult<WorkspaceState>,
    ) -> AppResult<Arc<WorkspaceState>> {
        let current = self.workspace();
        let next = op(current.as_ref())?;
        Ok(self.publish_workspace(next))
    }

    pub fn revert_file(&mut self, path: &str) -> AppResult<Arc<WorkspaceState>> {
        self.update_workspace(|ws| Ok(ws.revert_file(path)))
    }

    pub fn revert_all(&mut self) -> AppResult<Arc<WorkspaceState>> {
        self.update_workspace(WorkspaceState::revert_all)
    }

    /// Returns the new checkpoint's id.
    pub fn create_checkpoint(&mut self, label: impl Into<String>) -> String {
        let (next, id) = self.workspace().create_checkpoint(label);
        self.publish_workspace(next);
        id
    }

    pub fn restore_checkpoint(&mut self, checkpoint_id: &str) -> AppResult<Arc<WorkspaceState>> {
        self.update_workspace(|ws| ws.restore_checkpoint(checkpoint_id))
    }

    pub fn update_file(&mut self, path: &str, content: impl Into<String>) -> AppResult<Arc<WorkspaceState>> {
        let content = content.into();
        self.update_workspace(|ws| ws.update_file(path, content))
    }

    pub fn delete_file(&mut self, path: &str) -> AppResult<Arc<WorkspaceState>> {
        self.update_workspace(|ws| ws.delete_file(path))
    }

    pub fn set_active_path(&mut self, path: Option<&str>) -> AppResult<Arc<WorkspaceState>> {
        self.update_workspace(|ws| ws.set_active_path(path))
    }

    pub fn diff_against_base(&self, path: &str) -> AppResult<String> {
        Ok(self.workspace().diff_against_base(path)?)
    }

    pub fn diff_summary(&self) -> Vec<FileDiffSummary> {
        self.workspace().diff_summary()
    }

    fn publish_workspace(&mut self, workspace: WorkspaceState) -> Arc<WorkspaceState> {
        let workspace = Arc::new(workspace);
        self.workspace_tx.send_replace(Arc::clone(&workspace));
        self.notify(SessionNotice::WorkspaceUpdated(Arc::clone(&workspace)));
        workspace
    }

    fn notify(&self, notice: SessionNotice) {
        if let Some(tx) = self.notices.as_ref() {
            let _ = tx.send(notice);
        }
    }
}
