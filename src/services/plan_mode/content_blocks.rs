//! Content Blocks
//!
//! Splits a finished assistant message into ordered display blocks. Runs
//! once per turn on the final text, never on a live stream.

use serde::{Deserialize, Serialize};

use super::stream_parser::PlanStreamParser;
use crate::models::plan::{ClarifyingQuestion, PlanStep};

const QUESTION_OPEN: &str = "<question";
const QUESTION_CLOSE: &str = "</question>";
const PLAN_OPEN: &str = "<plan";
const PLAN_CLOSE: &str = "</plan>";
const SUMMARY_OPEN: &str = "<summary>";
const SUMMARY_CLOSE: &str = "</summary>";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    SectionHeader { level: u8, title: String },
    QuestionList { questions: Vec<ClarifyingQuestion> },
    Plan { title: String, steps: Vec<PlanStep> },
    Summary { text: String },
    Text { text: String },
}

/// Segment `text` into blocks in order of appearance.
///
/// A marker that never closes stays in the surrounding prose and scanning
/// continues after it.
pub fn segment_content(text: &str) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();
    let mut prose_from = 0;
    let mut scan = 0;

    while let Some((rel, kind)) = next_marker(&text[scan..]) {
        let start = scan + rel;
        let tail = &text[start..];
        let mut taken = Vec::new();

        let consumed = match kind {
            Marker::Question => take_questions(tail, &mut taken),
            Marker::Plan => take_plan(tail, &mut taken),
            Marker::Summary => take_summary(tail, &mut taken),
        };
        match consumed {
            Some(len) => {
                push_prose(&text[prose_from..start], &mut blocks);
                blocks.append(&mut taken);
                prose_from = start + len;
                scan = prose_from;
            }
            None => scan = start + kind.needle().len(),
        }
    }

    push_prose(&text[prose_from..], &mut blocks);
    blocks
}

#[derive(Clone, Copy)]
enum Marker {
    Question,
    Plan,
    Summary,
}

impl Marker {
    fn needle(self) -> &'static str {
        match self {
            Marker::Question => QUESTION_OPEN,
            Marker::Plan => PLAN_OPEN,
            Marker::Summary => SUMMARY_OPEN,
        }
    }
}

fn next_marker(text: &str) -> Option<(usize, Marker)> {
    [Marker::Question, Marker::Plan, Marker::Summary]
        .into_iter()
        .filter_map(|kind| text.find(kind.needle()).map(|idx| (idx, kind)))
        .min_by_key(|(idx, _)| *idx)
}

/// Consecutive question tags separated only by whitespace form one list.
fn take_questions(text: &str, blocks: &mut Vec<ContentBlock>) -> Option<usize> {
    let mut parser = PlanStreamParser::new();
    let mut consumed = 0;

    loop {
        let remaining = &text[consumed..];
        let trimmed = remaining.trim_start();
        if !trimmed.starts_with(QUESTION_OPEN) {
            break;
        }
        let lead = remaining.len() - trimmed.len();
        let Some(end) = trimmed.find(QUESTION_CLOSE) else {
            break;
        };
        let tag_len = end + QUESTION_CLOSE.len();
        parser.push(&trimmed[..tag_len]);
        consumed += lead + tag_len;
    }

    if consumed == 0 {
        return None;
    }
    if !parser.questions().is_empty() {
        blocks.push(ContentBlock::QuestionList {
            questions: parser.questions().to_vec(),
        });
    }
    Some(consumed)
}

fn take_plan(text: &str, blocks: &mut Vec<ContentBlock>) -> Option<usize> {
    let end = text.find(PLAN_CLOSE)? + PLAN_CLOSE.len();
    let mut parser = PlanStreamParser::new();
    parser.push(&text[..end]);
    let plan = parser.finalize()?;
    blocks.push(ContentBlock::Plan {
        title: plan.title,
        steps: plan.steps,
    });
    Some(end)
}

fn take_summary(text: &str, blocks: &mut Vec<ContentBlock>) -> Option<usize> {
    let end = text.find(SUMMARY_CLOSE)?;
    let body = text[SUMMARY_OPEN.len()..end].trim();
    if !body.is_empty() {
        blocks.push(ContentBlock::Summary {
            text: body.to_string(),
        });
    }
    Some(end + SUMMARY_CLOSE.len())
}

/// Markdown headings become section headers; other runs become text blocks.
fn push_prose(text: &str, blocks: &mut Vec<ContentBlock>) {
    let mut paragraph: Vec<&str> = Vec::new();

    for line in text.lines() {
        match heading(line) {
            Some((level, title)) => {
                flush_text(&mut paragraph, blocks);
                blocks.push(ContentBlock::SectionHeader {
                    level,
                    title: title.to_string(),
                });
            }
            None => paragraph.push(line),
        }
    }
    flush_text(&mut paragraph, blocks);
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let title = trimmed[level..].strip_prefix(' ')?.trim();
    (!title.is_empty()).then_some((level as u8, title))
}

fn flush_text(paragraph: &mut Vec<&str>, blocks: &mut Vec<ContentBlock>) {
    let text = paragraph.join("\n");
    paragraph.clear();
    let text = text.trim();
    if !text.is_empty() {
        blocks.push(ContentBlock::Text {
            text: text.to_string(),
        });
    }
}
