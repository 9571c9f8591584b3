//! Storage Layer
//!
//! JSON config persistence. Session state lives in memory only.

pub mod config;

pub use config::ConfigService;
