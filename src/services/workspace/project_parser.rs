//! Project Output Parser
//!
//! Classifies a turn's accumulated code text as single-file or multi-file
//! output. Multi-file output is a sequence of fenced blocks opened with a
//! `file:<relative/path>` annotation:
//!
//! ````text
//! ```file:src/app.ts
//! export const app = 1;
//! ```
//! ````
//!
//! The orchestrator re-parses the whole accumulator on every chunk, so the
//! result for a given prefix is deterministic and closed blocks are never
//! affected by text appended after them.

use serde::{Deserialize, Serialize};

use crate::models::workspace::{ProjectFile, ProjectOutput};
use crate::utils::error::WorkspaceError;

const FENCE: &str = "```";
const FILE_MARKER: &str = "file:";

/// Parser result with its completeness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedOutput {
    pub output: ProjectOutput,
    /// Every fence is closed (multi-file) or the code block is closed (single-file)
    pub complete: bool,
}

struct FencedBlock<'a> {
    info: &'a str,
    lines: Vec<&'a str>,
    closed: bool,
}

impl FencedBlock<'_> {
    fn file_path(&self) -> Option<&str> {
        self.info.trim().strip_prefix(FILE_MARKER).map(str::trim)
    }

    fn content(&self) -> String {
        self.lines.join("\n")
    }
}

/// Parse accumulated code text. Returns `None` while nothing usable exists.
pub fn parse_project_output(text: &str) -> Option<ParsedOutput> {
    let (blocks, fence_count) = scan_blocks(text);

    if blocks.iter().any(|b| b.file_path().is_some()) {
        return parse_multi_file(&blocks, fence_count);
    }
    parse_single_file(text, &blocks)
}

fn scan_blocks(text: &str) -> (Vec<FencedBlock<'_>>, usize) {
    let mut blocks = Vec::new();
    let mut current: Option<FencedBlock<'_>> = None;
    let mut fence_count = 0;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if let Some(info) = trimmed.strip_prefix(FENCE) {
            fence_count += 1;
            match current.take() {
                Some(mut block) => {
                    block.closed = true;
                    blocks.push(block);
                }
                None => {
                    current = Some(FencedBlock {
                        info,
                        lines: Vec::new(),
                        closed: false,
                    })
                }
            }
            continue;
        }
        if let Some(block) = current.as_mut() {
            block.lines.push(line);
        }
    }
    if let Some(block) = current {
        blocks.push(block);
    }
    (blocks, fence_count)
}

fn parse_multi_file(blocks: &[FencedBlock<'_>], fence_count: usize) -> Option<ParsedOutput> {
    let mut files: Vec<ProjectFile> = Vec::new();

    for block in blocks.iter().filter(|b| b.closed) {
        let Some(raw_path) = block.file_path() else {
            continue;
        };
        if raw_path.starts_with('/') {
            tracing::debug!(path = raw_path, "dropping absolute file path");
            continue;
        }
        let path = match normalize_path(raw_path) {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!(path = raw_path, error = %e, "dropping invalid file path");
                continue;
            }
        };
        let content = block.content();
        let language = language_for_path(&path)
            .map(str::to_string)
            .unwrap_or_else(|| sniff_language(&content).to_string());

        match files.iter_mut().find(|f| f.path == path) {
            Some(existing) => {
                existing.content = content;
                existing.language = language;
            }
            None => files.push(ProjectFile {
                path,
                content,
                language,
            }),
        }
    }

    if files.is_empty() {
        return None;
    }
    Some(ParsedOutput {
        output: ProjectOutput::Project { files },
        complete: fence_count % 2 == 0,
    })
}

fn parse_single_file(text: &str, blocks: &[FencedBlock<'_>]) -> Option<ParsedOutput> {
    match blocks.first() {
        Some(block) => {
            let content = block.content();
            if content.trim().is_empty() && !block.closed {
                return None;
            }
            let language = language_from_fence(block.info)
                .unwrap_or_else(|| sniff_language(&content).to_string());
            Some(ParsedOutput {
                output: ProjectOutput::Single { content, language },
                complete: block.closed,
            })
        }
        None => {
            let content = text.trim();
            if content.is_empty() {
                return None;
            }
            Some(ParsedOutput {
                output: ProjectOutput::Single {
                    content: content.to_string(),
                    language: sniff_language(content).to_string(),
                },
                // Unfenced text is only known to be whole once the turn ends.
                complete: false,
            })
        }
    }
}

/// Normalize a workspace-relative path: `\` becomes `/`, `./` and leading
/// `/` are stripped, empty segments collapse, and `..` is rejected.
pub fn normalize_path(path: &str) -> Result<String, WorkspaceError> {
    let unified = path.trim().replace('\\', "/");
    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(WorkspaceError::InvalidPath(path.to_string())),
            s if s.chars().any(char::is_control) => {
                return Err(WorkspaceError::InvalidPath(path.to_string()))
            }
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        return Err(WorkspaceError::InvalidPath(path.to_string()));
    }
    Ok(segments.join("/"))
}

/// Language for a path's extension, from the static table.
pub fn language_for_path(path: &str) -> Option<&'static str> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = file_name.rsplit_once('.')?;
    let language = match ext.to_ascii_lowercase().as_str() {
        "ts" | "tsx" | "mts" | "cts" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" | "sass" => "scss",
        "py" => "python",
        "rs" => "rust",
        "json" => "json",
        "md" | "markdown" => "markdown",
        "go" => "go",
        "java" => "java",
        "kt" => "kotlin",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "sh" | "bash" => "shell",
        "yml" | "yaml" => "yaml",
        "toml" => "toml",
        "sql" => "sql",
        "xml" | "svg" => "xml",
        "vue" => "vue",
        "svelte" => "svelte",
        "txt" => "plaintext",
        _ => return None,
    };
    Some(language)
}

/// Language from a fence info string such as `ts` or `python`.
fn language_from_fence(info: &str) -> Option<String> {
    let tag = info.split_whitespace().next()?.to_ascii_lowercase();
    let language = match tag.as_str() {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" => "javascript",
        "py" => "python",
        "rs" => "rust",
        "sh" | "bash" | "zsh" => "shell",
        "md" => "markdown",
        "htm" => "html",
        "yml" => "yaml",
        "text" | "txt" => "plaintext",
        other => return Some(other.to_string()),
    };
    Some(language.to_string())
}

/// Best guess for unlabeled code.
pub fn sniff_language(content: &str) -> &'static str {
    let trimmed = content.trim_start();
    let lower = trimmed.to_ascii_lowercase();

    if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
        return "html";
    }
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
    {
        return "json";
    }
    if content.contains("fn main(") || content.contains("let mut ") || content.contains("impl ") {
        return "rust";
    }
    if content.contains("def ") || content.contains("import numpy") || content.contains("print(") {
        return "python";
    }
    if content.contains("interface ")
        || content.contains(": string")
        || content.contains(": number")
    {
        return "typescript";
    }
    if content.contains("function ")
        || content.contains("const ")
        || content.contains("=>")
        || content.contains("document.")
    {
        return "javascript";
    }
    if lower.contains("<div") || lower.contains("<body") {
        return "html";
    }
    if looks_like_css(trimmed) {
        return "css";
    }
    "plaintext"
}

fn looks_like_css(content: &str) -> bool {
    let Some(open) = content.find('{') else {
        return false;
    };
    let selector = content[..open].trim();
    !selector.is_empty()
        && !selector.contains('(')
        && !selector.contains('=')
        && content[open..].contains(':')
        && content[open..].contains('}')
}

/// Canonical workspace path for single-file output in `language`.
pub fn placeholder_path(language: &str) -> &'static str {
    match language {
        "html" => "index.html",
        "css" => "styles.css",
        "javascript" => "index.js",
        "typescript" => "index.ts",
        "python" => "main.py",
        "rust" => "main.rs",
        "json" => "data.json",
        "markdown" => "README.md",
        _ => "snippet.txt",
    }
}
