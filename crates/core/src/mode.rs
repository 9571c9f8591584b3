//! Session Modes
//!
//! Plan mode only reads and proposes; Build mode is permitted to write files.

use serde::{Deserialize, Serialize};

/// Operating mode for a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Propose a plan and ask clarifying questions; never write files.
    Plan,
    /// Generate code and reconcile it into the workspace.
    #[default]
    Build,
}

impl SessionMode {
    /// Whether turns in this mode may write workspace files.
    pub fn allows_writes(&self) -> bool {
        matches!(self, SessionMode::Build)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Plan => "plan",
            SessionMode::Build => "build",
        }
    }
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plan" => Ok(SessionMode::Plan),
            "build" => Ok(SessionMode::Build),
            other => Err(format!("Unknown mode: {other}. Must be 'plan' or 'build'")),
        }
    }
}
