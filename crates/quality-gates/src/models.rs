//! Quality Gate Models

use serde::{Deserialize, Serialize};

/// Overall status of a quality check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateStatus {
    /// No error-level issues
    Passed,
    /// At least one error-level issue
    Failed,
    /// Nothing to check (e.g. unsupported language)
    Skipped,
}

impl GateStatus {
    /// Check if this status indicates success
    pub fn is_success(&self) -> bool {
        matches!(self, GateStatus::Passed | GateStatus::Skipped)
    }
}

impl std::fmt::Display for GateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateStatus::Passed => write!(f, "passed"),
            GateStatus::Failed => write!(f, "failed"),
            GateStatus::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueSeverity::Info => write!(f, "info"),
            IssueSeverity::Warning => write!(f, "warning"),
            IssueSeverity::Error => write!(f, "error"),
        }
    }
}

/// A single finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityIssue {
    pub rule_id: String,
    pub severity: IssueSeverity,
    pub message: String,
    /// 1-based line number, when the rule can point at one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl QualityIssue {
    pub fn new(rule_id: &str, severity: IssueSeverity, message: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity,
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// Result of checking one piece of code
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub language: String,
    pub status: GateStatus,
    pub passed: bool,
    pub issues: Vec<QualityIssue>,
    /// Unix timestamp (ms) when the check ran
    pub checked_at: i64,
}

impl QualityReport {
    /// Build a report; any error-level issue fails it.
    pub fn from_issues(language: &str, issues: Vec<QualityIssue>) -> Self {
        let failed = issues.iter().any(|i| i.severity == IssueSeverity::Error);
        let status = if failed {
            GateStatus::Failed
        } else {
            GateStatus::Passed
        };
        Self {
            language: language.to_string(),
            status,
            passed: !failed,
            issues,
            checked_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn skipped(language: &str) -> Self {
        Self {
            language: language.to_string(),
            status: GateStatus::Skipped,
            passed: true,
            issues: Vec::new(),
            checked_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Issues at or above `severity`.
    pub fn issues_at_least(&self, severity: IssueSeverity) -> impl Iterator<Item = &QualityIssue> {
        self.issues.iter().filter(move |i| i.severity >= severity)
    }
}
