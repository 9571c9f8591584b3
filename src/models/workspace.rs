//! Workspace Models
//!
//! Generated code output and the long-lived workspace it is reconciled into.
//! Operations on `WorkspaceState` live in `services::workspace::reconciler`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Path → content mapping. Ordered so snapshots and listings are stable.
pub type FileMap = BTreeMap<String, String>;

/// One file of a multi-file output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub path: String,
    pub content: String,
    pub language: String,
}

/// Parsed result of one turn's code text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProjectOutput {
    Single { content: String, language: String },
    Project { files: Vec<ProjectFile> },
}

impl ProjectOutput {
    pub fn mode(&self) -> WorkspaceMode {
        match self {
            ProjectOutput::Single { .. } => WorkspaceMode::Single,
            ProjectOutput::Project { .. } => WorkspaceMode::Project,
        }
    }

    pub fn file_count(&self) -> usize {
        match self {
            ProjectOutput::Single { .. } => 1,
            ProjectOutput::Project { files } => files.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceMode {
    #[default]
    Single,
    Project,
}

/// A named, immutable snapshot of workspace files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub id: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub files: FileMap,
}

/// Canonical workspace state. Every operation yields a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceState {
    pub files: FileMap,
    /// Diff origin for the current generation cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_files: Option<FileMap>,
    /// Generation that captured `base_files`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_generation: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_path: Option<String>,
    /// Checkpoints are never mutated, so old and new states share them
    #[serde(default)]
    pub checkpoints: Vec<Arc<Checkpoint>>,
    pub mode: WorkspaceMode,
}

impl WorkspaceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn has_base(&self) -> bool {
        self.base_files.is_some()
    }

    pub fn checkpoint(&self, id: &str) -> Option<&Checkpoint> {
        self.checkpoints
            .iter()
            .find(|c| c.id == id)
            .map(Arc::as_ref)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChangeType {
    Added,
    Modified,
    Deleted,
}

/// One changed path relative to the base snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiffSummary {
    pub path: String,
    pub change_type: FileChangeType,
    pub additions: usize,
    pub deletions: usize,
}
