//! Project Output Parser Integration Tests
//!
//! The orchestrator re-parses the whole accumulator on every chunk, so these
//! tests walk every prefix of a realistic multi-file stream.

use mint_ai::models::workspace::{ProjectFile, ProjectOutput};
use mint_ai::services::workspace::parse_project_output;

const TWO_FILES: &str = "```file:index.html\n<!DOCTYPE html>\n<html><body><script src=\"app.js\"></script></body></html>\n```\n```file:app.js\nconsole.log('hi');\n```\n";

fn project_files(output: &ProjectOutput) -> &[ProjectFile] {
    match output {
        ProjectOutput::Project { files } => files,
        other => panic!("expected project output, got {other:?}"),
    }
}

#[test]
fn test_code_chunk_scenario() {
    let parsed = parse_project_output("```file:a.ts\nconst x=1;\n```").unwrap();
    assert_eq!(
        parsed.output,
        ProjectOutput::Project {
            files: vec![ProjectFile {
                path: "a.ts".to_string(),
                content: "const x=1;".to_string(),
                language: "typescript".to_string(),
            }]
        }
    );
}

#[test]
fn test_reparse_is_deterministic() {
    for end in 0..=TWO_FILES.len() {
        if !TWO_FILES.is_char_boundary(end) {
            continue;
        }
        let prefix = &TWO_FILES[..end];
        assert_eq!(parse_project_output(prefix), parse_project_output(prefix));
    }
}

#[test]
fn test_closed_files_are_stable_across_prefixes() {
    let first_close = TWO_FILES.find("```\n```file:app.js").unwrap() + 3;
    let baseline = parse_project_output(&TWO_FILES[..first_close]).unwrap();
    let baseline_files = project_files(&baseline.output).to_vec();
    assert_eq!(baseline_files.len(), 1);
    assert_eq!(baseline_files[0].language, "html");

    for end in first_close..=TWO_FILES.len() {
        let parsed = parse_project_output(&TWO_FILES[..end]).unwrap();
        assert_eq!(project_files(&parsed.output)[0], baseline_files[0]);
    }

    let full = parse_project_output(TWO_FILES).unwrap();
    assert!(full.complete);
    assert_eq!(project_files(&full.output).len(), 2);
    assert_eq!(project_files(&full.output)[1].language, "javascript");
}

#[test]
fn test_open_file_block_is_withheld() {
    let partial = "```file:a.ts\nconst a = 1;\n```\n```file:b.ts\nconst b =";
    let parsed = parse_project_output(partial).unwrap();
    assert!(!parsed.complete);
    let files = project_files(&parsed.output);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "a.ts");
}

#[test]
fn test_nothing_usable_until_first_close() {
    assert!(parse_project_output("```file:a.ts\nconst a").is_none());
    assert!(parse_project_output("").is_none());
}

#[test]
fn test_single_file_uses_fence_language() {
    let parsed = parse_project_output("```css\nbody { margin: 0; }\n```").unwrap();
    assert!(parsed.complete);
    assert_eq!(
        parsed.output,
        ProjectOutput::Single {
            content: "body { margin: 0; }".to_string(),
            language: "css".to_string(),
        }
    );
}

#[test]
fn test_unfenced_html_is_sniffed() {
    let parsed = parse_project_output("<!DOCTYPE html>\n<html></html>").unwrap();
    assert!(!parsed.complete);
    match parsed.output {
        ProjectOutput::Single { language, .. } => assert_eq!(language, "html"),
        other => panic!("expected single output, got {other:?}"),
    }
}

#[test]
fn test_escaping_paths_are_dropped() {
    let text = "```file:../secrets.env\nKEY=1\n```\n```file:/etc/passwd\nroot\n```\n```file:ok.md\n# ok\n```";
    let parsed = parse_project_output(text).unwrap();
    let files = project_files(&parsed.output);
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "ok.md");
}
