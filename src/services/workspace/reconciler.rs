//! Workspace Reconciler
//!
//! Operations on `WorkspaceState`. None of them mutate in place: each builds
//! and returns a new state, so a reader holding an earlier snapshot never
//! observes a half-applied update.

use std::sync::Arc;

use chrono::Utc;
use similar::{ChangeTag, TextDiff};

use super::project_parser::{normalize_path, placeholder_path};
use crate::models::workspace::{
    Checkpoint, FileChangeType, FileDiffSummary, FileMap, ProjectOutput, WorkspaceState,
};
use crate::utils::error::WorkspaceError;

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

impl WorkspaceState {
    /// Merge `output` into the files. Files the output does not mention are
    /// kept. The first apply of a generation snapshots the pre-merge files as
    /// the diff base; later applies in the same generation leave it alone.
    ///
    /// All-or-nothing: an invalid path rejects the whole output.
    pub fn apply_output(&self, output: &ProjectOutput, generation: u64) -> WorkspaceResult<Self> {
        let writes: Vec<(String, &str)> = match output {
            ProjectOutput::Single { content, language } => {
                vec![(placeholder_path(language).to_string(), content.as_str())]
            }
            ProjectOutput::Project { files } => files
                .iter()
                .map(|f| Ok((normalize_path(&f.path)?, f.content.as_str())))
                .collect::<WorkspaceResult<_>>()?,
        };

        let mut next = self.clone();
        if self.base_generation.map_or(true, |g| g < generation) || self.base_files.is_none() {
            next.base_files = Some(self.files.clone());
            next.base_generation = Some(generation);
        }
        for (path, content) in &writes {
            next.files.insert(path.clone(), (*content).to_string());
        }
        next.mode = output.mode();

        let active_valid = next
            .active_path
            .as_ref()
            .is_some_and(|p| next.files.contains_key(p));
        if !active_valid {
            next.active_path = writes.first().map(|(path, _)| path.clone());
        }

        tracing::debug!(files = writes.len(), generation, mode = ?next.mode, "applied output to workspace");
        Ok(next)
    }

    /// Restore one file from the base snapshot. Reverting a path the base
    /// does not know (or with no base at all) is a no-op.
    pub fn revert_file(&self, path: &str) -> Self {
        let Ok(path) = normalize_path(path) else {
            return self.clone();
        };
        let Some(base_content) = self.base_files.as_ref().and_then(|b| b.get(&path)) else {
            return self.clone();
        };
        let mut next = self.clone();
        next.files.insert(path, base_content.clone());
        next
    }

    /// Restore every file from the base snapshot.
    pub fn revert_all(&self) -> WorkspaceResult<Self> {
        let base = self.base_files.as_ref().ok_or(WorkspaceError::NoBaseSnapshot)?;
        let mut next = self.clone();
        next.files = base.clone();
        next.fix_active_path();
        Ok(next)
    }

    /// Append a checkpoint of the current files. Returns the new state and
    /// the checkpoint id.
    pub fn create_checkpoint(&self, label: impl Into<String>) -> (Self, String) {
        let checkpoint = Checkpoint {
            id: uuid::Uuid::new_v4().to_string(),
            label: label.into(),
            created_at: Utc::now(),
            files: self.files.clone(),
        };
        let id = checkpoint.id.clone();
        let mut next = self.clone();
        next.checkpoints.push(Arc::new(checkpoint));
        (next, id)
    }

    /// Replace the files with a checkpoint's snapshot. The base snapshot and
    /// other checkpoints are untouched.
    pub fn restore_checkpoint(&self, checkpoint_id: &str) -> WorkspaceResult<Self> {
        let checkpoint = self
            .checkpoint(checkpoint_id)
            .ok_or_else(|| WorkspaceError::CheckpointNotFound(checkpoint_id.to_string()))?;
        let mut next = self.clone();
        next.files = checkpoint.files.clone();
        next.fix_active_path();
        Ok(next)
    }

    pub fn checkpoints(&self) -> &[Arc<Checkpoint>] {
        &self.checkpoints
    }

    /// Unified diff of `path` between the base snapshot and the current
    /// files. A side that does not have the file counts as empty. Identical
    /// contents yield an empty string.
    pub fn diff_against_base(&self, path: &str) -> WorkspaceResult<String> {
        let path = normalize_path(path)?;
        let base = self.base_files.as_ref().and_then(|b| b.get(&path));
        let current = self.files.get(&path);
        if base.is_none() && current.is_none() {
            return Err(WorkspaceError::FileNotFound(path));
        }
        Ok(unified_diff(
            base.map_or("", String::as_str),
            current.map_or("", String::as_str),
            &path,
        ))
    }

    /// Added, modified and deleted paths relative to the base snapshot.
    pub fn diff_summary(&self) -> Vec<FileDiffSummary> {
        let empty = FileMap::new();
        let base = self.base_files.as_ref().unwrap_or(&empty);
        let mut summary = Vec::new();

        for (path, content) in &self.files {
            let (change_type, old) = match base.get(path) {
                None => (FileChangeType::Added, ""),
                Some(old) if old != content => (FileChangeType::Modified, old.as_str()),
                Some(_) => continue,
            };
            let (additions, deletions) = count_changes(old, content);
            summary.push(FileDiffSummary {
                path: path.clone(),
                change_type,
                additions,
                deletions,
            });
        }
        for (path, old) in base {
            if !self.files.contains_key(path) {
                summary.push(FileDiffSummary {
                    path: path.clone(),
                    change_type: FileChangeType::Deleted,
                    additions: 0,
                    deletions: old.lines().count(),
                });
            }
        }
        summary.sort_by(|a, b| a.path.cmp(&b.path));
        summary
    }

    /// User edit of a single file. Does not touch the base snapshot.
    pub fn update_file(&self, path: &str, content: impl Into<String>) -> WorkspaceResult<Self> {
        let path = normalize_path(path)?;
        let mut next = self.clone();
        next.files.insert(path, content.into());
        Ok(next)
    }

    pub fn delete_file(&self, path: &str) -> WorkspaceResult<Self> {
        let path = normalize_path(path)?;
        if !self.files.contains_key(&path) {
            return Err(WorkspaceError::FileNotFound(path));
        }
        let mut next = self.clone();
        next.files.remove(&path);
        next.fix_active_path();
        Ok(next)
    }

    /// Select the viewed file. The path must exist; `None` clears it.
    pub fn set_active_path(&self, path: Option<&str>) -> WorkspaceResult<Self> {
        let active = match path {
            Some(path) => {
                let path = normalize_path(path)?;
                if !self.files.contains_key(&path) {
                    return Err(WorkspaceError::FileNotFound(path));
                }
                Some(path)
            }
            None => None,
        };
        let mut next = self.clone();
        next.active_path = active;
        Ok(next)
    }

    fn fix_active_path(&mut self) {
        let valid = self
            .active_path
            .as_ref()
            .is_some_and(|p| self.files.contains_key(p));
        if !valid {
            self.active_path = self.files.keys().next().cloned();
        }
    }
}

fn count_changes(old: &str, new: &str) -> (usize, usize) {
    let diff = TextDiff::from_lines(old, new);
    diff.iter_all_changes()
        .fold((0, 0), |(adds, dels), change| match change.tag() {
            ChangeTag::Insert => (adds + 1, dels),
            ChangeTag::Delete => (adds, dels + 1),
            ChangeTag::Equal => (adds, dels),
        })
}

/// Generate unified diff format between two strings
fn unified_diff(old_content: &str, new_content: &str, path: &str) -> String {
    if old_content == new_content {
        return String::new();
    }
    let diff = TextDiff::from_lines(old_content, new_content);
    let groups = diff.grouped_ops(3);

    let mut output = format!("--- a/{path}\n+++ b/{path}\n");

    for group in &groups {
        let (old_start, old_count, new_start, new_count) = group.iter().fold(
            (usize::MAX, 0usize, usize::MAX, 0usize),
            |(os, oc, ns, nc), op| {
                let old_range = op.old_range();
                let new_range = op.new_range();
                (
                    os.min(old_range.start),
                    oc + old_range.len(),
                    ns.min(new_range.start),
                    nc + new_range.len(),
                )
            },
        );

        output.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            hunk_start(old_start, old_count),
            old_count,
            hunk_start(new_start, new_count),
            new_count
        ));

        for op in group {
            for change in diff.iter_changes(op) {
                let prefix = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                output.push(prefix);
                output.push_str(change.value());
                if change.missing_newline() {
                    output.push_str("\n\\ No newline at end of file\n");
                }
            }
        }
    }

    output
}

/// Empty ranges are reported at the line before them, per unified diff.
fn hunk_start(start: usize, count: usize) -> usize {
    if count == 0 {
        start
    } else {
        start + 1
    }
}
