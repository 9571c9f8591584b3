//! Inline Tag Extractor
//!
//! Pulls complete `<tag attr="...">body</tag>` instances out of a growing
//! text buffer. Tags are leaf-only: an instance whose body contains another
//! opening of the same tag is malformed and skipped. Everything here is
//! best-effort over untrusted, possibly truncated model output; malformed
//! markup is left in the residual text and never reported as an error.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// One complete tag instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    pub attributes: HashMap<String, String>,
    pub body: String,
}

impl TagMatch {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Boolean attribute: false only for an explicit `"false"`.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.attr(key) {
            Some(v) => !v.trim().eq_ignore_ascii_case("false"),
            None => default,
        }
    }

    /// Comma-separated attribute as a trimmed list without empty items.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.attr(key).map(split_list).unwrap_or_default()
    }
}

/// Result of one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub tags: Vec<TagMatch>,
    /// Input with every extracted instance removed
    pub residual: String,
}

/// A complete opening tag such as `<plan title="x">`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningTag {
    /// Byte offset of `<`
    pub start: usize,
    /// Byte offset just past `>`
    pub end: usize,
    pub attributes: HashMap<String, String>,
    pub self_closing: bool,
}

fn attribute_regex() -> &'static Regex {
    static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
    ATTRIBUTE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_][\w-]*)\s*=\s*"([^"]*)""#).expect("attribute regex is valid")
    })
}

/// Parse `key="value"` pairs. Later duplicates win.
pub fn parse_attributes(text: &str) -> HashMap<String, String> {
    attribute_regex()
        .captures_iter(text)
        .map(|caps| (caps[1].to_ascii_lowercase(), caps[2].to_string()))
        .collect()
}

pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Position of the next `<tag` at or after `from` that is followed by
/// whitespace, `>`, `/`, or the end of the buffer.
fn find_open(buffer: &str, tag: &str, from: usize) -> Option<usize> {
    let needle = format!("<{tag}");
    let mut cursor = from;
    while let Some(rel) = buffer.get(cursor..)?.find(&needle) {
        let start = cursor + rel;
        let after = start + needle.len();
        match buffer[after..].chars().next() {
            None => return Some(start),
            Some(c) if c.is_whitespace() || c == '>' || c == '/' => return Some(start),
            _ => cursor = after,
        }
    }
    None
}

/// How far an opening tag that starts at a given offset got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagEnd {
    /// Offset of the closing `>`
    Complete(usize),
    /// Can never complete; scanning resumes at this offset.
    Malformed(usize),
    /// Ran out of buffer before the tag ended.
    Pending,
}

/// Find the `>` ending an opening tag, ignoring `>` inside quoted attribute
/// values. An opening never spans another tag, and a quoted value never
/// spans a line, so an unbalanced quote is caught at the next newline or
/// markup `<`.
fn find_tag_end(buffer: &str, start: usize) -> TagEnd {
    let mut in_quotes = false;
    let mut chars = buffer[start + 1..].char_indices().peekable();
    while let Some((rel, c)) = chars.next() {
        let idx = start + 1 + rel;
        match c {
            '"' => in_quotes = !in_quotes,
            '>' if !in_quotes => return TagEnd::Complete(idx),
            '\n' if in_quotes => return TagEnd::Malformed(idx),
            '<' if !in_quotes => return TagEnd::Malformed(idx),
            '<' => {
                let starts_markup = chars
                    .peek()
                    .is_some_and(|(_, next)| *next == '/' || next.is_ascii_alphabetic());
                if starts_markup {
                    return TagEnd::Malformed(idx);
                }
            }
            _ => {}
        }
    }
    TagEnd::Pending
}

fn opening_at(buffer: &str, tag: &str, start: usize, gt: usize) -> OpeningTag {
    let inner = &buffer[start + 1 + tag.len()..gt];
    OpeningTag {
        start,
        end: gt + 1,
        attributes: parse_attributes(inner),
        self_closing: inner.trim_end().ends_with('/'),
    }
}

/// First complete opening tag for `tag`, if any. Malformed candidates
/// before it are passed over.
pub fn find_opening_tag(buffer: &str, tag: &str) -> Option<OpeningTag> {
    let mut cursor = 0;
    while let Some(start) = find_open(buffer, tag, cursor) {
        match find_tag_end(buffer, start) {
            TagEnd::Complete(gt) => return Some(opening_at(buffer, tag, start, gt)),
            TagEnd::Malformed(resume) => cursor = resume,
            TagEnd::Pending => return None,
        }
    }
    None
}

/// Extract every complete `tag` instance from `buffer`.
///
/// Malformed openings stay in the residual and scanning continues after
/// them. Scanning stops at the first instance that may still complete; it
/// and everything after it stay in the residual so a later pass can pick
/// them up.
pub fn extract_tags(buffer: &str, tag: &str) -> Extraction {
    let close = format!("</{tag}>");
    let mut tags = Vec::new();
    let mut residual = String::with_capacity(buffer.len());
    let mut cursor = 0;

    while let Some(start) = find_open(buffer, tag, cursor) {
        let opening = match find_tag_end(buffer, start) {
            TagEnd::Complete(gt) => opening_at(buffer, tag, start, gt),
            TagEnd::Malformed(resume) => {
                tracing::debug!(tag, "skipping malformed opening tag");
                residual.push_str(&buffer[cursor..resume]);
                cursor = resume;
                continue;
            }
            TagEnd::Pending => break,
        };

        if opening.self_closing {
            residual.push_str(&buffer[cursor..start]);
            tags.push(TagMatch {
                attributes: opening.attributes,
                body: String::new(),
            });
            cursor = opening.end;
            continue;
        }

        let Some(close_rel) = buffer[opening.end..].find(&close) else {
            break;
        };
        let body_end = opening.end + close_rel;

        // Leaf-only: a nested opening makes the outer instance malformed.
        if let Some(inner) = find_open(buffer, tag, opening.end).filter(|i| *i < body_end) {
            tracing::debug!(tag, "skipping tag with nested opening");
            residual.push_str(&buffer[cursor..inner]);
            cursor = inner;
            continue;
        }

        residual.push_str(&buffer[cursor..start]);
        tags.push(TagMatch {
            attributes: opening.attributes,
            body: buffer[opening.end..body_end].to_string(),
        });
        cursor = body_end + close.len();
    }

    residual.push_str(&buffer[cursor..]);
    Extraction { tags, residual }
}

/// Start of the first `tag` instance that is not yet closed. Malformed
/// openings are never pending.
pub fn first_unclosed(buffer: &str, tag: &str) -> Option<usize> {
    let close = format!("</{tag}>");
    let mut cursor = 0;
    while let Some(start) = find_open(buffer, tag, cursor) {
        let gt = match find_tag_end(buffer, start) {
            TagEnd::Complete(gt) => gt,
            TagEnd::Malformed(resume) => {
                cursor = resume;
                continue;
            }
            TagEnd::Pending => return Some(start),
        };
        let end = gt + 1;
        if buffer[start..gt].trim_end().ends_with('/') {
            cursor = end;
            continue;
        }
        match buffer[end..].find(&close) {
            Some(rel) => cursor = end + rel + close.len(),
            None => return Some(start),
        }
    }
    None
}

/// Start of an opening tag whose `>` has not arrived yet.
pub fn first_incomplete_opening(buffer: &str, tag: &str) -> Option<usize> {
    let mut cursor = 0;
    while let Some(start) = find_open(buffer, tag, cursor) {
        match find_tag_end(buffer, start) {
            TagEnd::Complete(gt) => cursor = gt + 1,
            TagEnd::Malformed(resume) => cursor = resume,
            TagEnd::Pending => return Some(start),
        }
    }
    None
}

/// Start of a tail that could grow into one of `markers` (e.g. `<que`).
pub fn partial_marker_suffix(buffer: &str, markers: &[&str]) -> Option<usize> {
    markers
        .iter()
        .filter_map(|marker| {
            (1..=marker.len())
                .rev()
                .filter(|k| marker.is_char_boundary(*k))
                .find(|k| buffer.ends_with(&marker[..*k]))
                .map(|k| buffer.len() - k)
        })
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_complete_tags_and_keeps_residual() {
        let buffer = "intro <question id=\"q1\">Proceed?</question> middle <question id=\"q2\">Wh";
        let result = extract_tags(buffer, "question");
        assert_eq!(result.tags.len(), 1);
        assert_eq!(result.tags[0].attr("id"), Some("q1"));
        assert_eq!(result.tags[0].body, "Proceed?");
        assert_eq!(result.residual, "intro  middle <question id=\"q2\">Wh");
    }

    #[test]
    fn test_attribute_parsing_and_defaults() {
        let result = extract_tags(
            "<question required=\"false\" options=\"A, B ,,C\">Pick</question>",
            "question",
        );
        let tag = &result.tags[0];
        assert!(!tag.flag("required", true));
        assert!(tag.flag("missing", true));
        assert_eq!(tag.list("options"), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_partial_opening_is_left_alone() {
        let result = extract_tags("text <step id=\"1", "step");
        assert!(result.tags.is_empty());
        assert_eq!(result.residual, "text <step id=\"1");
    }

    #[test]
    fn test_nested_same_tag_skips_outer() {
        let buffer = "<step id=\"a\">Outer <step id=\"b\">Inner</step> tail</step>";
        let result = extract_tags(buffer, "step");
        assert_eq!(result.tags.len(), 1);
        assert_eq!(result.tags[0].attr("id"), Some("b"));
        assert!(result.residual.starts_with("<step id=\"a\">Outer "));
    }

    #[test]
    fn test_similar_tag_names_are_not_matched() {
        let result = extract_tags("<steps>x</steps><step>Real</step>", "step");
        assert_eq!(result.tags.len(), 1);
        assert_eq!(result.tags[0].body, "Real");
        assert_eq!(result.residual, "<steps>x</steps>");
    }

    #[test]
    fn test_gt_inside_quoted_attribute() {
        let opening = find_opening_tag("<plan title=\"a > b\">", "plan").unwrap();
        assert_eq!(opening.attributes["title"], "a > b");
        assert_eq!(opening.end, "<plan title=\"a > b\">".len());
    }

    #[test]
    fn test_malformed_input_never_panics() {
        for input in ["<", "<question", "</question>", "<question>>", "<question \"x>y</question>", "ü<step>é"] {
            let _ = extract_tags(input, "question");
            let _ = extract_tags(input, "step");
            let _ = first_unclosed(input, "step");
            let _ = partial_marker_suffix(input, &["<question", "</plan>"]);
        }
    }

    #[test]
    fn test_unbalanced_quote_does_not_hide_later_tags() {
        let buffer = "<step id=\"1>One</step><step id=\"2\">Two</step><step id=\"3\">Three</step>";
        let result = extract_tags(buffer, "step");
        let ids: Vec<_> = result.tags.iter().filter_map(|t| t.attr("id")).collect();
        assert_eq!(ids, vec!["2", "3"]);
        assert_eq!(result.residual, "<step id=\"1>One</step>");

        let buffer = "<question id=\"q1>Broken?</question>\n<question id=\"q2\">Valid?</question>";
        let result = extract_tags(buffer, "question");
        assert_eq!(result.tags.len(), 1);
        assert_eq!(result.tags[0].attr("id"), Some("q2"));
        assert_eq!(result.tags[0].body, "Valid?");
    }

    #[test]
    fn test_quote_left_open_across_a_newline_is_malformed() {
        let buffer = "<step title=\"oops\nstill prose\n<step>Real</step>";
        let result = extract_tags(buffer, "step");
        assert_eq!(result.tags.len(), 1);
        assert_eq!(result.tags[0].body, "Real");
        assert_eq!(first_unclosed(buffer, "step"), None);
    }

    #[test]
    fn test_malformed_opening_is_not_pending() {
        assert_eq!(first_unclosed("<step id=\"1>One</step>", "step"), None);
        assert_eq!(first_incomplete_opening("<plan title=\"x\n<plan title=\"Y\">", "plan"), None);
        let opening = find_opening_tag("<plan title=\"x\n<plan title=\"Y\">", "plan").unwrap();
        assert_eq!(opening.attributes["title"], "Y");
    }

    #[test]
    fn test_pending_detection() {
        assert_eq!(first_unclosed("ab <step>x</step> <step>y", "step"), Some(18));
        assert_eq!(first_unclosed("<step>x</step>", "step"), None);
        assert_eq!(first_incomplete_opening("go <plan title=\"T", "plan"), Some(3));
        assert_eq!(partial_marker_suffix("hello <que", &["<question", "<step"]), Some(6));
        assert_eq!(partial_marker_suffix("hello", &["<question"]), None);
    }
}
