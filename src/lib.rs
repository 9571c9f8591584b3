//! Mint AI
//!
//! Streaming session engine for a code-generating assistant:
//! - `services::session` - turn orchestration over the backend event stream
//! - `services::plan_mode` - incremental plan extraction from explanation text
//! - `services::workspace` - code output parsing and workspace reconciliation
//! - `storage` - JSON config
//! - `models` and `utils` - shared value types, errors and paths

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::plan::{ExecutionPlan, PlanStatus};
pub use models::session::{InputStatus, SessionNotice, TurnOutcome, TurnSummary};
pub use models::settings::{AppConfig, SettingsUpdate};
pub use models::workspace::{ProjectOutput, WorkspaceState};
pub use services::session::SessionOrchestrator;
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult, SessionError, WorkspaceError};
