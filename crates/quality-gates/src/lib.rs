//! Mint AI Quality Gates
//!
//! Advisory quality checks run over generated code once a turn completes.
//! Results are informational only; a failed check never blocks a turn.
//!
//! - `models` - Report types (GateStatus, IssueSeverity, QualityIssue, QualityReport)
//! - `checker` - The `CodeQualityChecker` collaborator trait and the built-in
//!   heuristic `StaticAnalysisChecker`

pub mod checker;
pub mod models;

pub use checker::{CodeQualityChecker, StaticAnalysisChecker};
pub use models::{GateStatus, IssueSeverity, QualityIssue, QualityReport};
