//! Plan Stream Parser
//!
//! Incremental parser for plan markup in streamed explanation text.
//!
//! ```text
//! NoPlan --<plan title="..">--> Open --</plan>--> Closed
//! ```
//!
//! Each `push` scans only the unconsumed buffer: extracted `<question>` and
//! `<step>` instances and the plan markers are removed, so already-seen text
//! is never rescanned. Questions and steps are accumulated in any phase; only
//! the finalized status depends on whether the plan block was closed.

use std::collections::HashSet;

use chrono::Utc;

use super::tag_extractor::{self, TagMatch};
use crate::models::plan::{ClarifyingQuestion, Complexity, ExecutionPlan, PlanStep, StepStatus};

/// Default trailing window kept between chunks.
pub const DEFAULT_BUFFER_WINDOW: usize = 500;

/// A partial tag older than this is abandoned so the buffer stays bounded.
const MAX_PENDING_TAG_CHARS: usize = 16 * 1024;

const QUESTION_TAG: &str = "question";
const STEP_TAG: &str = "step";
const PLAN_TAG: &str = "plan";
const PLAN_CLOSE: &str = "</plan>";
const MARKERS: &[&str] = &["<question", "<step", "<plan", PLAN_CLOSE];

const UNTITLED_PLAN: &str = "Untitled plan";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanPhase {
    #[default]
    NoPlan,
    Open,
    Closed,
}

/// What one `push` newly observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanStreamDelta {
    pub new_questions: Vec<ClarifyingQuestion>,
    pub new_steps: Vec<PlanStep>,
    pub plan_opened: bool,
    pub plan_closed: bool,
}

impl PlanStreamDelta {
    pub fn is_empty(&self) -> bool {
        self.new_questions.is_empty()
            && self.new_steps.is_empty()
            && !self.plan_opened
            && !self.plan_closed
    }
}

/// Per-turn parser state. Discarded once the turn is finalized.
#[derive(Debug)]
pub struct PlanStreamParser {
    plan_id: String,
    buffer: String,
    window: usize,
    phase: PlanPhase,
    title: Option<String>,
    questions: Vec<ClarifyingQuestion>,
    steps: Vec<PlanStep>,
    /// Text of id-less questions, so a repeated tag does not duplicate
    anonymous_questions: HashSet<String>,
    /// Title and description of id-less steps
    anonymous_steps: HashSet<(String, String)>,
}

impl Default for PlanStreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanStreamParser {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_BUFFER_WINDOW)
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            plan_id: uuid::Uuid::new_v4().to_string(),
            buffer: String::new(),
            window,
            phase: PlanPhase::NoPlan,
            title: None,
            questions: Vec::new(),
            steps: Vec::new(),
            anonymous_questions: HashSet::new(),
            anonymous_steps: HashSet::new(),
        }
    }

    pub fn phase(&self) -> PlanPhase {
        self.phase
    }

    pub fn questions(&self) -> &[ClarifyingQuestion] {
        &self.questions
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Unconsumed trailing text.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Whether anything plan-related has been seen this turn.
    pub fn has_content(&self) -> bool {
        self.phase != PlanPhase::NoPlan || !self.questions.is_empty() || !self.steps.is_empty()
    }

    /// Append a chunk of explanation text and report what it completed.
    pub fn push(&mut self, chunk: &str) -> PlanStreamDelta {
        let mut delta = PlanStreamDelta::default();
        self.buffer.push_str(chunk);

        if self.phase == PlanPhase::NoPlan {
            if let Some(opening) = tag_extractor::find_opening_tag(&self.buffer, PLAN_TAG) {
                let title = opening
                    .attributes
                    .get("title")
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty());
                tracing::debug!(title = ?title, "plan block opened");
                self.title = title;
                self.buffer.replace_range(opening.start..opening.end, "");
                self.phase = PlanPhase::Open;
                delta.plan_opened = true;
            }
        }

        let questions = tag_extractor::extract_tags(&self.buffer, QUESTION_TAG);
        self.buffer = questions.residual;
        for tag in &questions.tags {
            if let Some(question) = self.accept_question(tag) {
                delta.new_questions.push(question);
            }
        }

        let steps = tag_extractor::extract_tags(&self.buffer, STEP_TAG);
        self.buffer = steps.residual;
        for tag in &steps.tags {
            if let Some(step) = self.accept_step(tag) {
                delta.new_steps.push(step);
            }
        }

        if self.phase == PlanPhase::Open {
            if let Some(idx) = self.buffer.find(PLAN_CLOSE) {
                tracing::debug!(steps = self.steps.len(), "plan block closed");
                self.buffer.replace_range(idx..idx + PLAN_CLOSE.len(), "");
                self.phase = PlanPhase::Closed;
                delta.plan_closed = true;
            }
        }

        self.truncate_buffer();
        delta
    }

    fn accept_question(&mut self, tag: &TagMatch) -> Option<ClarifyingQuestion> {
        let text = tag.body.trim();
        if text.is_empty() {
            return None;
        }

        let id = match tag.attr("id").map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => {
                if self.questions.iter().any(|q| q.id == id) {
                    return None;
                }
                id.to_string()
            }
            None => {
                if !self.anonymous_questions.insert(text.to_string()) {
                    return None;
                }
                synthetic_id("q")
            }
        };

        let question = ClarifyingQuestion {
            id,
            question: text.to_string(),
            options: tag.list("options"),
            required: tag.flag("required", true),
            answer: None,
        };
        self.questions.push(question.clone());
        Some(question)
    }

    fn accept_step(&mut self, tag: &TagMatch) -> Option<PlanStep> {
        let body = tag.body.trim();
        let (title, description) = match body.split_once('\n') {
            Some((first, rest)) => (first.trim(), rest.trim()),
            None => (body, ""),
        };
        if title.is_empty() {
            return None;
        }

        let id = match tag.attr("id").map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => {
                if self.steps.iter().any(|s| s.id == id) {
                    return None;
                }
                id.to_string()
            }
            None => {
                let key = (title.to_string(), description.to_string());
                if !self.anonymous_steps.insert(key) {
                    return None;
                }
                synthetic_id("step")
            }
        };

        let step = PlanStep {
            id,
            order: self.steps.len() as u32 + 1,
            title: title.to_string(),
            description: description.to_string(),
            status: StepStatus::Pending,
            files_to_modify: tag.list("files"),
            estimated_complexity: tag
                .attr("complexity")
                .map(Complexity::parse_lenient)
                .unwrap_or_default(),
            dependencies: tag.list("depends"),
        };
        self.steps.push(step.clone());
        Some(step)
    }

    /// Keep only the trailing window, never cutting into a pending tag.
    fn truncate_buffer(&mut self) {
        let char_count = self.buffer.chars().count();
        if char_count <= self.window {
            return;
        }

        let mut cut = self
            .buffer
            .char_indices()
            .nth(char_count - self.window)
            .map(|(idx, _)| idx)
            .unwrap_or(self.buffer.len());

        if let Some(pending) = self.pending_start() {
            let pending_chars = self.buffer[pending..].chars().count();
            if pending < cut && pending_chars <= MAX_PENDING_TAG_CHARS {
                cut = pending;
            }
        }

        if cut > 0 {
            self.buffer.drain(..cut);
        }
    }

    /// Earliest offset of markup that may still complete.
    fn pending_start(&self) -> Option<usize> {
        let mut candidates = vec![
            tag_extractor::first_unclosed(&self.buffer, QUESTION_TAG),
            tag_extractor::first_unclosed(&self.buffer, STEP_TAG),
            tag_extractor::partial_marker_suffix(&self.buffer, MARKERS),
        ];
        if self.phase == PlanPhase::NoPlan {
            candidates.push(tag_extractor::first_incomplete_opening(&self.buffer, PLAN_TAG));
        }
        candidates.into_iter().flatten().min()
    }

    /// Current plan as an immutable value, or `None` if nothing was seen.
    pub fn snapshot(&self) -> Option<ExecutionPlan> {
        if !self.has_content() {
            return None;
        }
        let mut plan = ExecutionPlan::new(
            self.title
                .clone()
                .unwrap_or_else(|| UNTITLED_PLAN.to_string()),
        );
        plan.id = self.plan_id.clone();
        plan.steps = self.steps.clone();
        plan.clarifying_questions = self.questions.clone();
        plan.plan_complete = self.phase == PlanPhase::Closed;
        Some(plan.touched())
    }

    /// Finish the turn: derive the terminal status and stamp `updated_at`.
    pub fn finalize(self) -> Option<ExecutionPlan> {
        self.snapshot()
    }
}

/// `prefix-<millis>-<8 hex chars>`
fn synthetic_id(prefix: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}
