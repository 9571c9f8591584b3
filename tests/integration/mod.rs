//! Integration Tests Module
//!
//! End-to-end coverage of the streaming session engine: plan extraction,
//! project output parsing, workspace reconciliation, full turns over a
//! replayed event stream, HTTP retry behaviour and config persistence.

// Plan stream parser over chunked explanation text
mod plan_stream_test;

// Project output parser idempotence and classification
mod project_output_test;

// Workspace reconciler operations
mod workspace_test;

// Full turns through the orchestrator with a replay backend
mod session_stream_test;

// HTTP backend retry behaviour against a mock server
mod backend_retry_test;

// Config file persistence
mod config_test;
