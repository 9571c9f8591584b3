//! Session Stream Event Types
//!
//! Typed events carried by the generation backend's event stream. Each wire
//! record is an `event: <type>` line plus a `data: <json>` line; the LLM crate
//! handles framing and hands `(event, data)` pairs to
//! [`SessionStreamEvent::from_wire`].

use serde::{Deserialize, Deserializer, Serialize};

pub const EVENT_SKILL_ACTIVATED: &str = "skill-activated";
pub const EVENT_THINKING_CHUNK: &str = "thinking-chunk";
pub const EVENT_THINKING_COMPLETE: &str = "thinking-complete";
pub const EVENT_EXPLANATION_CHUNK: &str = "explanation-chunk";
pub const EVENT_CODE_CHUNK: &str = "code-chunk";
pub const EVENT_DONE: &str = "done";
pub const EVENT_ERROR: &str = "error";

/// One decoded backend event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionStreamEvent {
    /// A skill was selected for this turn
    SkillActivated { skill: SkillDescriptor },

    /// Reasoning text for one thinking track
    ThinkingChunk {
        thinking_type: String,
        content: String,
    },

    /// A thinking track has finished
    ThinkingComplete { thinking_type: String },

    /// User-facing explanation text (may carry inline plan tags)
    ExplanationChunk { content: String },

    /// Generated code text
    CodeChunk { content: String },

    /// Turn complete
    Done(DonePayload),

    /// Backend reported a fatal error for this turn
    Error { error: String },
}

impl SessionStreamEvent {
    /// Decode an event from its wire name and JSON data payload.
    pub fn from_wire(event: &str, data: &str) -> Result<Self, AdapterError> {
        let data = if data.trim().is_empty() { "{}" } else { data };
        let parse_err = |e: serde_json::Error| AdapterError::ParseError(format!("{event}: {e}"));

        match event {
            EVENT_SKILL_ACTIVATED => {
                let payload: SkillActivatedData = serde_json::from_str(data).map_err(parse_err)?;
                Ok(SessionStreamEvent::SkillActivated {
                    skill: payload.into_descriptor(),
                })
            }
            EVENT_THINKING_CHUNK => {
                let payload: ThinkingChunkData = serde_json::from_str(data).map_err(parse_err)?;
                Ok(SessionStreamEvent::ThinkingChunk {
                    thinking_type: payload.thinking_type,
                    content: payload.content,
                })
            }
            EVENT_THINKING_COMPLETE => {
                let payload: ThinkingCompleteData =
                    serde_json::from_str(data).map_err(parse_err)?;
                Ok(SessionStreamEvent::ThinkingComplete {
                    thinking_type: payload.thinking_type,
                })
            }
            EVENT_EXPLANATION_CHUNK => {
                let payload: ContentData = serde_json::from_str(data).map_err(parse_err)?;
                Ok(SessionStreamEvent::ExplanationChunk {
                    content: payload.content,
                })
            }
            EVENT_CODE_CHUNK => {
                let payload: ContentData = serde_json::from_str(data).map_err(parse_err)?;
                Ok(SessionStreamEvent::CodeChunk {
                    content: payload.content,
                })
            }
            EVENT_DONE => {
                let payload: DonePayload = serde_json::from_str(data).map_err(parse_err)?;
                Ok(SessionStreamEvent::Done(payload))
            }
            EVENT_ERROR => {
                let payload: ErrorData = serde_json::from_str(data).map_err(parse_err)?;
                Ok(SessionStreamEvent::Error {
                    error: payload.error,
                })
            }
            other => Err(AdapterError::UnsupportedEvent(other.to_string())),
        }
    }

    /// The wire name of this event.
    pub fn wire_name(&self) -> &'static str {
        match self {
            SessionStreamEvent::SkillActivated { .. } => EVENT_SKILL_ACTIVATED,
            SessionStreamEvent::ThinkingChunk { .. } => EVENT_THINKING_CHUNK,
            SessionStreamEvent::ThinkingComplete { .. } => EVENT_THINKING_COMPLETE,
            SessionStreamEvent::ExplanationChunk { .. } => EVENT_EXPLANATION_CHUNK,
            SessionStreamEvent::CodeChunk { .. } => EVENT_CODE_CHUNK,
            SessionStreamEvent::Done(_) => EVENT_DONE,
            SessionStreamEvent::Error { .. } => EVENT_ERROR,
        }
    }

    /// Whether this event ends the turn.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStreamEvent::Done(_) | SessionStreamEvent::Error { .. }
        )
    }
}

/// Payload of the `done` event. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonePayload {
    /// Definitive code for the turn, replacing the streamed accumulator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub cost: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub tokens: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<serde_json::Value>,
}

/// A skill the backend activated for the turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared capabilities; `None` means the skill declared nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<SkillCapability>>,
}

/// Capability flags a skill must hold before the orchestrator acts for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCapability {
    ReadWorkspace,
    WriteFiles,
    Network,
}

impl std::fmt::Display for SkillCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkillCapability::ReadWorkspace => write!(f, "read_workspace"),
            SkillCapability::WriteFiles => write!(f, "write_files"),
            SkillCapability::Network => write!(f, "network"),
        }
    }
}

/// Errors that can occur while decoding a wire record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AdapterError {
    /// JSON/data parsing error
    ParseError(String),
    /// Event type not recognized
    UnsupportedEvent(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AdapterError::UnsupportedEvent(msg) => write!(f, "Unsupported event: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

// ── Wire payload shapes ────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum SkillActivatedData {
    Wrapped { skill: SkillDescriptor },
    Bare(SkillDescriptor),
}

impl SkillActivatedData {
    fn into_descriptor(self) -> SkillDescriptor {
        match self {
            SkillActivatedData::Wrapped { skill } => skill,
            SkillActivatedData::Bare(skill) => skill,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingChunkData {
    thinking_type: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingCompleteData {
    thinking_type: String,
}

#[derive(Deserialize)]
struct ContentData {
    content: String,
}

#[derive(Deserialize)]
struct ErrorData {
    #[serde(default = "default_error_message")]
    error: String,
}

fn default_error_message() -> String {
    "Unknown backend error".to_string()
}

/// Accept `"12"`, `12`, `0.5` or `null` for fields the backend sends loosely typed.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}
