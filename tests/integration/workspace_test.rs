//! Workspace Reconciler Integration Tests
//!
//! Exercises merge, revert, checkpoint and diff operations as a sequence of
//! turns would drive them.

use std::sync::Arc;

use mint_ai::models::workspace::{FileChangeType, ProjectFile, ProjectOutput, WorkspaceState};
use mint_ai::utils::error::WorkspaceError;

// ============================================================================
// Helper Functions
// ============================================================================

fn project(files: &[(&str, &str)]) -> ProjectOutput {
    ProjectOutput::Project {
        files: files
            .iter()
            .map(|(path, content)| ProjectFile {
                path: path.to_string(),
                content: content.to_string(),
                language: "typescript".to_string(),
            })
            .collect(),
    }
}

fn seeded() -> WorkspaceState {
    WorkspaceState::new()
        .apply_output(&project(&[("a.ts", "old a"), ("b.ts", "old b")]), 1)
        .unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_merge_preserves_untouched_files() {
    let next = seeded()
        .apply_output(&project(&[("a.ts", "new a")]), 2)
        .unwrap();
    assert_eq!(next.file("a.ts"), Some("new a"));
    assert_eq!(next.file("b.ts"), Some("old b"));
}

#[test]
fn test_base_snapshot_taken_once_per_generation() {
    let ws = seeded();
    let first = ws.apply_output(&project(&[("a.ts", "v1")]), 2).unwrap();
    let second = first.apply_output(&project(&[("a.ts", "v2")]), 2).unwrap();
    let base = second.base_files.as_ref().unwrap();
    assert_eq!(base.get("a.ts").map(String::as_str), Some("old a"));

    let next_turn = second.apply_output(&project(&[("a.ts", "v3")]), 3).unwrap();
    let base = next_turn.base_files.as_ref().unwrap();
    assert_eq!(base.get("a.ts").map(String::as_str), Some("v2"));
}

#[test]
fn test_revert_all_without_base_is_precondition_failure() {
    let ws = WorkspaceState::new().update_file("a.ts", "hand written").unwrap();
    assert_eq!(ws.revert_all().unwrap_err(), WorkspaceError::NoBaseSnapshot);
    assert_eq!(ws.file("a.ts"), Some("hand written"));
}

#[test]
fn test_revert_file_and_revert_all() {
    let ws = seeded()
        .apply_output(&project(&[("a.ts", "new a"), ("b.ts", "new b"), ("c.ts", "c")]), 2)
        .unwrap();

    let reverted = ws.revert_file("a.ts");
    assert_eq!(reverted.file("a.ts"), Some("old a"));
    assert_eq!(reverted.file("b.ts"), Some("new b"));

    // Not in the base: nothing to restore.
    let untouched = ws.revert_file("c.ts");
    assert_eq!(untouched.file("c.ts"), Some("c"));

    let all = ws.revert_all().unwrap();
    assert_eq!(all.file("a.ts"), Some("old a"));
    assert_eq!(all.file("b.ts"), Some("old b"));
    assert_eq!(all.file("c.ts"), None);
}

#[test]
fn test_checkpoint_restores_byte_for_byte() {
    let (ws, id) = seeded().create_checkpoint("before edits");
    let edited = ws
        .update_file("a.ts", "edited\r\nwith CRLF")
        .unwrap()
        .delete_file("b.ts")
        .unwrap()
        .update_file("new.ts", "extra")
        .unwrap();

    let restored = edited.restore_checkpoint(&id).unwrap();
    assert_eq!(restored.files, ws.files);
    assert_eq!(restored.base_files, edited.base_files);
    assert_eq!(restored.checkpoints().len(), 1);
}

#[test]
fn test_restore_unknown_checkpoint() {
    let err = seeded().restore_checkpoint("missing").unwrap_err();
    assert_eq!(err, WorkspaceError::CheckpointNotFound("missing".to_string()));
}

#[test]
fn test_checkpoints_are_shared_not_copied() {
    let (ws, _) = seeded().create_checkpoint("one");
    let next = ws.update_file("a.ts", "changed").unwrap();
    assert!(Arc::ptr_eq(&ws.checkpoints()[0], &next.checkpoints()[0]));
}

#[test]
fn test_prior_snapshot_is_never_mutated() {
    let before = Arc::new(seeded());
    let after = before
        .apply_output(&project(&[("a.ts", "new a")]), 2)
        .unwrap();
    assert_eq!(before.file("a.ts"), Some("old a"));
    assert_eq!(after.file("a.ts"), Some("new a"));
}

#[test]
fn test_diff_against_base() {
    let ws = seeded()
        .apply_output(&project(&[("a.ts", "line one\nline two\n"), ("n.ts", "fresh\n")]), 2)
        .unwrap();

    let diff = ws.diff_against_base("n.ts").unwrap();
    assert!(diff.starts_with("--- a/n.ts\n+++ b/n.ts\n"));
    assert!(diff.contains("+fresh"));

    let unchanged = ws.diff_against_base("b.ts").unwrap();
    assert!(unchanged.is_empty());

    assert!(matches!(
        ws.diff_against_base("nope.ts"),
        Err(WorkspaceError::FileNotFound(_))
    ));

    let summary = ws.diff_summary();
    let paths: Vec<_> = summary.iter().map(|s| (s.path.as_str(), s.change_type)).collect();
    assert_eq!(
        paths,
        vec![("a.ts", FileChangeType::Modified), ("n.ts", FileChangeType::Added)]
    );
}

#[test]
fn test_single_output_uses_placeholder_path() {
    let ws = WorkspaceState::new()
        .apply_output(
            &ProjectOutput::Single {
                content: "<p>hi</p>".to_string(),
                language: "html".to_string(),
            },
            1,
        )
        .unwrap();
    assert_eq!(ws.file("index.html"), Some("<p>hi</p>"));
    assert_eq!(ws.active_path.as_deref(), Some("index.html"));
}
