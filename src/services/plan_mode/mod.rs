//! Plan Mode Service
//!
//! Plan markup embedded in streamed explanation text:
//! - `tag_extractor` - complete `<question>`/`<step>` instances out of a growing buffer
//! - `stream_parser` - incremental plan accumulation and finalization
//! - `content_blocks` - segmentation of a finished message for display

pub mod content_blocks;
pub mod stream_parser;
pub mod tag_extractor;

pub use content_blocks::{segment_content, ContentBlock};
pub use stream_parser::{PlanPhase, PlanStreamDelta, PlanStreamParser, DEFAULT_BUFFER_WINDOW};
pub use tag_extractor::{extract_tags, Extraction, TagMatch};
