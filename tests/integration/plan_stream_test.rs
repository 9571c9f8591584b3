//! Plan Stream Parser Integration Tests
//!
//! Feeds realistic explanation streams through the parser in uneven chunks.

use mint_ai::models::plan::{Complexity, PlanStatus, StepStatus};
use mint_ai::services::plan_mode::{PlanPhase, PlanStreamParser};

// ============================================================================
// Helper Functions
// ============================================================================

/// Push `text` in fixed-size character chunks and return the parser.
fn feed(text: &str, chunk_chars: usize) -> PlanStreamParser {
    let mut parser = PlanStreamParser::new();
    let chars: Vec<char> = text.chars().collect();
    for chunk in chars.chunks(chunk_chars) {
        parser.push(&chunk.iter().collect::<String>());
    }
    parser
}

const FULL_PLAN: &str = r#"I need a couple of details first.
<question id="q1" required="true" options="Yes,No">Proceed?</question>
<question id="q2" required="false">Any colour preference?</question>
Here is the plan:
<plan title="Landing page">
<step id="1" complexity="low" files="index.html">Scaffold markup
Create the page skeleton with header and footer.</step>
<step id="2" complexity="high" files="styles.css,app.js" depends="1">Style and wire up
Add responsive styles and the signup handler.</step>
</plan>
Let me know when you're ready."#;

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_question_scenario_fields() {
    let parser = feed(
        r#"<question id="q1" required="true" options="Yes,No">Proceed?</question>"#,
        5,
    );
    let questions = parser.questions();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].id, "q1");
    assert_eq!(questions[0].question, "Proceed?");
    assert!(questions[0].required);
    assert_eq!(questions[0].options, vec!["Yes".to_string(), "No".to_string()]);
    assert!(questions[0].answer.is_none());
}

#[test]
fn test_full_plan_across_chunk_sizes() {
    for size in [1, 3, 7, 64, 4096] {
        let plan = feed(FULL_PLAN, size).finalize().unwrap();
        assert_eq!(plan.title, "Landing page", "chunk size {size}");
        assert_eq!(plan.clarifying_questions.len(), 2, "chunk size {size}");
        assert_eq!(plan.steps.len(), 2, "chunk size {size}");
        assert!(plan.plan_complete);
        assert_eq!(plan.status, PlanStatus::Questioning);

        let second = &plan.steps[1];
        assert_eq!(second.title, "Style and wire up");
        assert_eq!(second.description, "Add responsive styles and the signup handler.");
        assert_eq!(second.estimated_complexity, Complexity::High);
        assert_eq!(second.files_to_modify, vec!["styles.css", "app.js"]);
        assert_eq!(second.dependencies, vec!["1"]);
        assert_eq!(second.status, StepStatus::Pending);
    }
}

#[test]
fn test_steps_are_ordered_by_position() {
    let plan = feed(FULL_PLAN, 11).finalize().unwrap();
    for (i, step) in plan.steps.iter().enumerate() {
        assert_eq!(step.order, i as u32 + 1);
    }
}

#[test]
fn test_duplicate_question_yields_one_entry() {
    let tag = r#"<question id="q1">Proceed?</question>"#;
    let mut parser = PlanStreamParser::new();
    parser.push(tag);
    parser.push(tag);
    let plan = parser.finalize().unwrap();
    assert_eq!(
        plan.clarifying_questions
            .iter()
            .filter(|q| q.id == "q1")
            .count(),
        1
    );
}

#[test]
fn test_unanswered_required_question_forces_questioning() {
    let text = r#"<question id="q1">Which database?</question><plan title="T"><step>Only</step></plan>"#;
    let plan = feed(text, 4).finalize().unwrap();
    assert_eq!(plan.status, PlanStatus::Questioning);

    let answered = plan.answer_question("q1", "Postgres").unwrap();
    assert_eq!(answered.status, PlanStatus::Ready);
}

#[test]
fn test_unclosed_plan_stays_drafting() {
    let text = r#"<plan title="T"><step id="1">One</step>"#;
    let parser = feed(text, 6);
    assert_eq!(parser.phase(), PlanPhase::Open);
    let plan = parser.finalize().unwrap();
    assert_eq!(plan.status, PlanStatus::Drafting);
    assert!(!plan.plan_complete);
}

#[test]
fn test_malformed_markup_is_skipped() {
    let text = r#"<question id="x"></question><step>  </step><question id="q2" required="false">Ok?</question>"#;
    let plan = feed(text, 9).finalize().unwrap();
    assert_eq!(plan.clarifying_questions.len(), 1);
    assert_eq!(plan.clarifying_questions[0].id, "q2");
    assert!(plan.steps.is_empty());
}

#[test]
fn test_plain_text_yields_no_plan() {
    let parser = feed("Just a regular answer without any markup.", 8);
    assert!(!parser.has_content());
    assert!(parser.finalize().is_none());
}

#[test]
fn test_long_preamble_does_not_lose_tags() {
    let mut text = "filler ".repeat(400);
    text.push_str(r#"<step id="late">Late step
with a description</step>"#);
    let parser = feed(&text, 13);
    assert_eq!(parser.steps().len(), 1);
    assert!(parser.buffer().chars().count() <= 500);
}
