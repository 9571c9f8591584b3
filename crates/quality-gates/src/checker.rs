//! Code Quality Checker
//!
//! `CodeQualityChecker` is the collaborator the orchestrator consults after a
//! turn. `StaticAnalysisChecker` is the built-in implementation: a handful of
//! cheap text heuristics keyed by language.

use async_trait::async_trait;
use mint_ai_core::{CoreError, CoreResult};

use crate::models::{IssueSeverity, QualityIssue, QualityReport};

/// Lines longer than this are flagged.
const MAX_LINE_LENGTH: usize = 200;

/// Larger inputs are refused rather than scanned.
pub const MAX_CHECK_BYTES: usize = 1024 * 1024;

/// Languages whose bracket balance is meaningful to check.
const BRACKET_LANGUAGES: &[&str] = &[
    "javascript",
    "typescript",
    "rust",
    "java",
    "go",
    "c",
    "cpp",
    "csharp",
    "css",
];

/// Advisory checker: `(code, language) -> report`.
#[async_trait]
pub trait CodeQualityChecker: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, code: &str, language: &str) -> CoreResult<QualityReport>;
}

/// Heuristic checker needing no external tools.
#[derive(Debug, Default, Clone)]
pub struct StaticAnalysisChecker;

impl StaticAnalysisChecker {
    pub fn new() -> Self {
        Self
    }

    /// Run every rule synchronously.
    pub fn analyze(&self, code: &str, language: &str) -> QualityReport {
        let language = language.to_ascii_lowercase();
        if code.trim().is_empty() {
            return QualityReport::from_issues(
                &language,
                vec![QualityIssue::new(
                    "empty-output",
                    IssueSeverity::Error,
                    "Generated code is empty",
                )],
            );
        }
        if language == "plaintext" || language == "markdown" {
            return QualityReport::skipped(&language);
        }

        let mut issues = Vec::new();
        check_lines(code, &language, &mut issues);
        if BRACKET_LANGUAGES.contains(&language.as_str()) {
            check_brackets(code, &mut issues);
        }
        if language == "html" {
            check_html(code, &mut issues);
        }
        if language == "json" {
            check_json(code, &mut issues);
        }
        QualityReport::from_issues(&language, issues)
    }
}

#[async_trait]
impl CodeQualityChecker for StaticAnalysisChecker {
    fn name(&self) -> &'static str {
        "static-analysis"
    }

    async fn check(&self, code: &str, language: &str) -> CoreResult<QualityReport> {
        if code.len() > MAX_CHECK_BYTES {
            return Err(CoreError::validation(format!(
                "code exceeds {MAX_CHECK_BYTES} bytes ({} bytes)",
                code.len()
            )));
        }
        let report = self.analyze(code, language);
        tracing::debug!(
            language = %report.language,
            issues = report.issues.len(),
            passed = report.passed,
            "static analysis finished"
        );
        Ok(report)
    }
}

fn check_lines(code: &str, language: &str, issues: &mut Vec<QualityIssue>) {
    let is_script = matches!(language, "javascript" | "typescript" | "html");

    for (idx, line) in code.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim_start();

        if line.chars().count() > MAX_LINE_LENGTH {
            issues.push(
                QualityIssue::new(
                    "long-line",
                    IssueSeverity::Info,
                    format!("Line exceeds {MAX_LINE_LENGTH} characters"),
                )
                .at_line(line_no),
            );
        }
        if trimmed.contains("TODO") || trimmed.contains("FIXME") {
            issues.push(
                QualityIssue::new("todo-marker", IssueSeverity::Info, "Unfinished work marker")
                    .at_line(line_no),
            );
        }
        if is_script && trimmed.contains("console.log(") {
            issues.push(
                QualityIssue::new(
                    "debug-statement",
                    IssueSeverity::Warning,
                    "console.log left in generated code",
                )
                .at_line(line_no),
            );
        }
        if is_script && (trimmed.starts_with("eval(") || trimmed.contains(" eval(")) {
            issues.push(
                QualityIssue::new("eval-usage", IssueSeverity::Error, "Use of eval()")
                    .at_line(line_no),
            );
        }
        if language == "python" && (trimmed.starts_with("eval(") || trimmed.starts_with("exec(")) {
            issues.push(
                QualityIssue::new("eval-usage", IssueSeverity::Error, "Use of eval()/exec()")
                    .at_line(line_no),
            );
        }
    }
}

/// Counts brackets outside string literals and line comments.
fn check_brackets(code: &str, issues: &mut Vec<QualityIssue>) {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string: Option<char> = None;

    for line in code.lines() {
        let mut chars = line.chars().peekable();
        let mut escaped = false;
        while let Some(c) = chars.next() {
            if let Some(quote) = in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == quote {
                    in_string = None;
                }
                continue;
            }
            match c {
                '"' | '\'' | '`' => in_string = Some(c),
                '/' if chars.peek() == Some(&'/') => break,
                '(' | '[' | '{' => stack.push(c),
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    if stack.pop() != Some(expected) {
                        issues.push(QualityIssue::new(
                            "unbalanced-brackets",
                            IssueSeverity::Warning,
                            format!("Unexpected '{c}'"),
                        ));
                        return;
                    }
                }
                _ => {}
            }
        }
        // Only template literals span lines.
        if in_string.is_some_and(|q| q != '`') {
            in_string = None;
        }
    }

    if !stack.is_empty() {
        issues.push(QualityIssue::new(
            "unbalanced-brackets",
            IssueSeverity::Warning,
            format!("{} unclosed bracket(s)", stack.len()),
        ));
    }
}

fn check_html(code: &str, issues: &mut Vec<QualityIssue>) {
    let lower = code.to_ascii_lowercase();
    if !lower.trim_start().starts_with("<!doctype html") {
        issues.push(QualityIssue::new(
            "missing-doctype",
            IssueSeverity::Warning,
            "HTML document has no <!DOCTYPE html>",
        ));
    }
    if lower.contains("<html") && !lower.contains("</html>") {
        issues.push(QualityIssue::new(
            "unclosed-html",
            IssueSeverity::Warning,
            "<html> element is never closed",
        ));
    }
}

fn check_json(code: &str, issues: &mut Vec<QualityIssue>) {
    if let Err(e) = serde_json::from_str::<serde_json::Value>(code) {
        issues.push(
            QualityIssue::new("invalid-json", IssueSeverity::Error, e.to_string()).at_line(e.line()),
        );
    }
}
