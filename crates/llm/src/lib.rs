//! Mint AI LLM
//!
//! Plumbing between the session orchestrator and the model backend:
//! - `sse` - record framing for the backend's text event stream
//! - `provider` - the `GenerationBackend` trait and HTTP error mapping
//! - `backend` - reqwest implementation of `GenerationBackend`
//! - `replay` - in-memory backend that plays back a recorded transcript
//! - `retry` - bounded retry policy for opening a stream
//! - `types` - request types and the `LlmError` taxonomy

pub mod backend;
pub mod http_client;
pub mod provider;
pub mod replay;
pub mod retry;
pub mod sse;
pub mod types;

// Re-export main types
pub use backend::HttpGenerationBackend;
pub use http_client::build_http_client;
pub use provider::{ByteStream, GenerationBackend};
pub use replay::ReplayBackend;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use sse::{SseDecoder, SseRecord};
pub use types::*;
