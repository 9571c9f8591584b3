//! HTTP Client Factory
//!
//! Builds the reqwest client used for generation requests.

use std::time::Duration;

use super::types::{LlmError, LlmResult};

/// Build a `reqwest::Client` for streaming generation requests.
///
/// Only connection setup is bounded by `connect_timeout`; an established
/// stream is never cut off by a client-side timeout.
pub fn build_http_client(connect_timeout: Duration) -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(concat!("mint-ai/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| LlmError::Configuration {
            message: format!("failed to build HTTP client: {e}"),
        })
}
