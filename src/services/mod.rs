//! Services
//!
//! Business logic for a chat session. Services own no I/O beyond the
//! generation backend handed to the orchestrator.

pub mod plan_mode;
pub mod session;
pub mod workspace;

pub use plan_mode::{segment_content, ContentBlock, PlanStreamParser};
pub use session::{SessionOrchestrator, SessionUsageLedger, SkillRegistry, UsageRecorder};
pub use workspace::{parse_project_output, ParsedOutput};
