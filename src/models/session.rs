//! Session Models
//!
//! Turn-level state the orchestrator exposes: the message list, thinking
//! records, input status, and the notices it publishes to observers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mint_ai_core::SkillDescriptor;
use serde::{Deserialize, Serialize};

use super::plan::ExecutionPlan;
use super::workspace::{ProjectOutput, WorkspaceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    /// Display text; assistant text only ever grows during a turn
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content.into())
    }

    /// Empty assistant placeholder filled in while the turn streams.
    pub fn assistant_placeholder() -> Self {
        Self::with_role(MessageRole::Assistant, String::new())
    }

    fn with_role(role: MessageRole, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Reasoning text for one thinking track, upserted by `thinking_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingRecord {
    pub thinking_type: String,
    pub content: String,
    pub is_complete: bool,
}

/// Per-turn input state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputStatus {
    #[default]
    Ready,
    Submitting,
    Streaming,
    Error,
}

impl InputStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, InputStatus::Submitting | InputStatus::Streaming)
    }
}

/// Cost and token counts reported by the backend for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub cost: Option<String>,
    pub tokens: Option<String>,
}

impl UsageReport {
    pub fn is_empty(&self) -> bool {
        self.cost.is_none() && self.tokens.is_none()
    }

    pub fn cost_value(&self) -> f64 {
        parse_number(self.cost.as_deref())
    }

    pub fn token_count(&self) -> u64 {
        parse_number(self.tokens.as_deref()) as u64
    }
}

fn parse_number(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().trim_start_matches('$').parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}

/// Result of a finished turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnSummary {
    pub message: ChatMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<ProjectOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<ExecutionPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<SkillDescriptor>,
    pub usage: UsageReport,
}

/// How a turn ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Completed(Box<TurnSummary>),
    /// Abandoned by the caller; partial text and applied files are kept
    Cancelled,
}

impl TurnOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TurnOutcome::Cancelled)
    }

    pub fn summary(&self) -> Option<&TurnSummary> {
        match self {
            TurnOutcome::Completed(summary) => Some(summary),
            TurnOutcome::Cancelled => None,
        }
    }
}

/// Notices for observers of a session.
#[derive(Debug, Clone)]
pub enum SessionNotice {
    WorkspaceUpdated(Arc<WorkspaceState>),
    PlanUpdated(Arc<ExecutionPlan>),
    TurnCompleted { message_id: String },
    /// User-facing error message for a failed turn
    TurnFailed { error: String },
}
