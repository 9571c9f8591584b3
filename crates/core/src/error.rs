//! Core Error Types
//!
//! Errors shared by the leaf crates of the Mint AI workspace. Kept to
//! thiserror + std so the core crate stays lightweight.

use thiserror::Error;

/// Core error type for the Mint AI workspace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Input a collaborator refuses to process
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
