//! Mint AI Core
//!
//! Foundational types for the Mint AI workspace. This crate has zero
//! dependencies on application-level code (HTTP clients, storage, parsers).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `mode` - Plan / Build operating modes (`SessionMode`)
//! - `streaming` - Wire event types emitted by the generation backend
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/thiserror** - keeps build times minimal
//! 2. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod error;
pub mod mode;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Modes ──────────────────────────────────────────────────────────────
pub use mode::SessionMode;

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{
    AdapterError, DonePayload, SessionStreamEvent, SkillCapability, SkillDescriptor,
};
