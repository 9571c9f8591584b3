//! Data Models
//!
//! Value types shared across the session, plan and workspace services.

pub mod plan;
pub mod session;
pub mod settings;
pub mod workspace;

pub use plan::*;
pub use session::*;
pub use settings::*;
pub use workspace::*;
