//! Workspace Service
//!
//! Streamed code output and the workspace it is reconciled into.

pub mod project_parser;
pub mod reconciler;

pub use project_parser::{
    language_for_path, normalize_path, parse_project_output, placeholder_path, sniff_language,
    ParsedOutput,
};
pub use reconciler::WorkspaceResult;
