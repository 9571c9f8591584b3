//! Backend Request and Error Types

use serde::{Deserialize, Serialize};

use mint_ai_core::SessionMode;

/// One generation request; a turn issues exactly one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// The user's message for this turn
    pub message: String,
    /// Plan or Build
    pub mode: SessionMode,
    /// Backend conversation id from a previous `done` event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    /// Prior plan and step context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_context: Option<PlanContext>,
}

impl GenerationRequest {
    pub fn new(message: impl Into<String>, mode: SessionMode) -> Self {
        Self {
            message: message.into(),
            mode,
            chat_id: None,
            plan_context: None,
        }
    }

    pub fn with_chat_id(mut self, chat_id: Option<String>) -> Self {
        self.chat_id = chat_id;
        self
    }

    pub fn with_plan_context(mut self, context: Option<PlanContext>) -> Self {
        self.plan_context = context;
        self
    }
}

/// Plan state forwarded to the backend so it can continue from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanContext {
    pub title: String,
    pub status: String,
    pub steps: Vec<PlanStepContext>,
    /// The step a Build-mode turn is executing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_step: Option<PlanStepContext>,
    #[serde(default)]
    pub answers: Vec<AnsweredQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStepContext {
    pub id: String,
    pub order: u32,
    pub title: String,
    pub description: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_to_modify: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredQuestion {
    pub question: String,
    pub answer: String,
}

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// Authentication failed
    AuthenticationFailed { message: String },
    /// Rate limit exceeded
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },
    /// Invalid request (4xx validation failure)
    InvalidRequest { message: String },
    /// Server error from the backend
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// Network/connection error
    NetworkError { message: String },
    /// Backend misconfigured on our side (bad URL, client build failure)
    Configuration { message: String },
    /// Other error
    Other { message: String },
}

impl LlmError {
    /// Transient failures worth another attempt. 4xx validation failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::NetworkError { .. }
                | LlmError::ServerError { .. }
                | LlmError::RateLimited { .. }
        )
    }

    /// Server-provided wait hint, if any.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            LlmError::RateLimited {
                retry_after: Some(secs),
                ..
            } => Some(u64::from(*secs)),
            _ => None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        LlmError::NetworkError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            LlmError::RateLimited { message, .. } => {
                write!(f, "Rate limited: {}", message)
            }
            LlmError::InvalidRequest { message } => {
                write!(f, "Invalid request: {}", message)
            }
            LlmError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            LlmError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            LlmError::Configuration { message } => {
                write!(f, "Backend configuration error: {}", message)
            }
            LlmError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Result type for backend operations
pub type LlmResult<T> = Result<T, LlmError>;
