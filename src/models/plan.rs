//! Plan Models
//!
//! One planning cycle (`ExecutionPlan`) with its ordered steps and clarifying
//! questions. Plans follow an immutable-update discipline: every operation
//! returns a new value and stamps `updated_at`, so a holder of an older
//! `Arc<ExecutionPlan>` never sees it change.

use chrono::{DateTime, Utc};
use mint_ai_llm::{AnsweredQuestion, PlanContext, PlanStepContext};
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Plan lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Drafting,
    Questioning,
    Ready,
    Approved,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanStatus::Drafting => write!(f, "DRAFTING"),
            PlanStatus::Questioning => write!(f, "QUESTIONING"),
            PlanStatus::Ready => write!(f, "READY"),
            PlanStatus::Approved => write!(f, "APPROVED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Active,
    Complete,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Active => "active",
            StepStatus::Complete => "complete",
            StepStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Complete | StepStatus::Skipped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    /// Lenient parse; unknown values fall back to `Medium`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Complexity::Low,
            "high" => Complexity::High,
            _ => Complexity::Medium,
        }
    }
}

/// A single step in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub id: String,
    /// 1-based; always equals the step's index in `steps` plus one
    pub order: u32,
    pub title: String,
    pub description: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_to_modify: Vec<String>,
    pub estimated_complexity: Complexity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

/// A question the assistant needs answered before (or while) planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClarifyingQuestion {
    pub id: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl ClarifyingQuestion {
    pub fn is_unanswered(&self) -> bool {
        self.answer.as_deref().map_or(true, |a| a.trim().is_empty())
    }

    pub fn blocks_plan(&self) -> bool {
        self.required && self.is_unanswered()
    }
}

/// One planning cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub id: String,
    pub title: String,
    pub status: PlanStatus,
    pub steps: Vec<PlanStep>,
    pub clarifying_questions: Vec<ClarifyingQuestion>,
    /// Whether the `<plan>` block was closed in the stream
    #[serde(default)]
    pub plan_complete: bool,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionPlan {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            status: PlanStatus::Drafting,
            steps: Vec::new(),
            clarifying_questions: Vec::new(),
            plan_complete: false,
            updated_at: Utc::now(),
        }
    }

    /// Status implied by the current questions, steps and block completion.
    ///
    /// `Approved` is sticky and only reachable through [`ExecutionPlan::approve`].
    pub fn derive_status(&self) -> PlanStatus {
        if self.status == PlanStatus::Approved {
            return PlanStatus::Approved;
        }
        if self.clarifying_questions.iter().any(ClarifyingQuestion::blocks_plan) {
            PlanStatus::Questioning
        } else if self.plan_complete && !self.steps.is_empty() {
            PlanStatus::Ready
        } else {
            PlanStatus::Drafting
        }
    }

    /// Copy with `status` re-derived and `updated_at` bumped.
    pub fn touched(mut self) -> Self {
        self.status = self.derive_status();
        self.updated_at = next_timestamp(self.updated_at);
        self
    }

    pub fn unanswered_required(&self) -> impl Iterator<Item = &ClarifyingQuestion> {
        self.clarifying_questions.iter().filter(|q| q.blocks_plan())
    }

    pub fn question(&self, id: &str) -> Option<&ClarifyingQuestion> {
        self.clarifying_questions.iter().find(|q| q.id == id)
    }

    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn active_step(&self) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Active)
    }

    /// Record a user's answer.
    pub fn answer_question(&self, question_id: &str, answer: impl Into<String>) -> AppResult<Self> {
        let mut next = self.clone();
        let question = next
            .clarifying_questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or_else(|| AppError::not_found(format!("Question not found: {question_id}")))?;
        question.answer = Some(answer.into());
        Ok(next.touched())
    }

    /// READY → APPROVED. Any other starting status is a validation error.
    pub fn approve(&self) -> AppResult<Self> {
        match self.derive_status() {
            PlanStatus::Ready => {
                let mut next = self.clone();
                next.status = PlanStatus::Approved;
                next.updated_at = next_timestamp(self.updated_at);
                Ok(next)
            }
            PlanStatus::Approved => Err(AppError::validation("Plan is already approved")),
            other => Err(AppError::validation(format!(
                "Only a READY plan can be approved (status is {other})"
            ))),
        }
    }

    /// Activate the first pending step in `order`. Returns `None` when all
    /// steps are finished or one is already active.
    pub fn start_next_step(&self) -> Option<Self> {
        if self.active_step().is_some() {
            return None;
        }
        let idx = self
            .steps
            .iter()
            .position(|s| s.status == StepStatus::Pending)?;
        let mut next = self.clone();
        next.steps[idx].status = StepStatus::Active;
        Some(next.touched())
    }

    /// Mark the active step complete. No-op copy when nothing is active.
    pub fn complete_active_step(&self) -> Self {
        let mut next = self.clone();
        if let Some(step) = next
            .steps
            .iter_mut()
            .find(|s| s.status == StepStatus::Active)
        {
            step.status = StepStatus::Complete;
        }
        next.touched()
    }

    pub fn skip_step(&self, step_id: &str) -> AppResult<Self> {
        let mut next = self.clone();
        let step = next
            .steps
            .iter_mut()
            .find(|s| s.id == step_id)
            .ok_or_else(|| AppError::not_found(format!("Step not found: {step_id}")))?;
        if step.status.is_terminal() {
            return Err(AppError::validation(format!(
                "Step {step_id} is already {}",
                step.status.as_str()
            )));
        }
        step.status = StepStatus::Skipped;
        Ok(next.touched())
    }

    /// Whether every step is complete or skipped.
    pub fn is_finished(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.status.is_terminal())
    }

    /// Context forwarded to the backend with the next request.
    pub fn to_context(&self) -> PlanContext {
        PlanContext {
            title: self.title.clone(),
            status: self.status.to_string(),
            steps: self.steps.iter().map(PlanStep::to_context).collect(),
            active_step: self.active_step().map(PlanStep::to_context),
            answers: self
                .clarifying_questions
                .iter()
                .filter_map(|q| {
                    q.answer.as_ref().map(|answer| AnsweredQuestion {
                        question: q.question.clone(),
                        answer: answer.clone(),
                    })
                })
                .collect(),
        }
    }
}

impl PlanStep {
    fn to_context(&self) -> PlanStepContext {
        PlanStepContext {
            id: self.id.clone(),
            order: self.order,
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status.as_str().to_string(),
            files_to_modify: self.files_to_modify.clone(),
        }
    }
}

/// Strictly increasing timestamp, even when the clock has not advanced.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + chrono::Duration::microseconds(1)
    }
}
