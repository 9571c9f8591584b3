//! Error Handling
//!
//! Unified error types for the application.
//! Uses thiserror for ergonomic error definitions.

use mint_ai_llm::LlmError;
use thiserror::Error;

/// Workspace precondition failures reported to the action that triggered them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("No base snapshot exists to revert to")]
    NoBaseSnapshot,

    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(String),

    #[error("Invalid workspace path: {0}")]
    InvalidPath(String),

    #[error("File not found in workspace: {0}")]
    FileNotFound(String),
}

/// Turn-level failures raised by the session orchestrator.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A turn is already in flight
    #[error("A turn is already in progress")]
    Busy,

    /// The initial request failed (after retries, when retryable)
    #[error("Backend request failed: {0}")]
    Backend(#[from] LlmError),

    /// The backend sent an explicit `error` event
    #[error("Generation aborted: {0}")]
    StreamAborted(String),

    /// The stream ended before a `done` event
    #[error("Stream closed before completion")]
    StreamClosed,
}

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Workspace precondition errors
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
