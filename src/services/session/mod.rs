//! Session Service
//!
//! One chat session: the stream orchestrator plus the skill and usage
//! collaborators it consults.

pub mod orchestrator;
pub mod skills;
pub mod usage;

pub use orchestrator::SessionOrchestrator;
pub use skills::{SkillGrant, SkillRegistry, DEFAULT_CAPABILITIES};
pub use usage::{SessionUsageLedger, UsageRecorder, UsageTotals, UNASSIGNED_CHAT};
