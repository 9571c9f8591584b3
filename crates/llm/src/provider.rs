//! Generation Backend Trait
//!
//! Defines the narrow interface the orchestrator uses to reach the model
//! backend: one request in, one raw event stream out.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use super::types::{GenerationRequest, LlmError, LlmResult};

/// Raw byte stream of the backend's event-stream response.
pub type ByteStream = Pin<Box<dyn Stream<Item = LlmResult<Bytes>> + Send>>;

/// Trait that all generation backends must implement.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Returns the backend name for identification and logging.
    fn name(&self) -> &'static str;

    /// Issue the turn's request and return the response body stream.
    ///
    /// Errors here are request-level failures (connection refused, non-2xx);
    /// they are what the retry policy sees.
    async fn open_stream(&self, request: &GenerationRequest) -> LlmResult<ByteStream>;
}

/// Map an HTTP status and body to an `LlmError`.
pub fn parse_http_error(status: u16, body: &str, backend: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid credentials", backend),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", backend),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400..=499 => LlmError::InvalidRequest {
            message: format!("HTTP {}: {}", status, body),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_http_error() {
        let err = parse_http_error(401, "unauthorized", "mint");
        assert!(matches!(err, LlmError::AuthenticationFailed { .. }));

        let err = parse_http_error(422, "message is required", "mint");
        assert!(matches!(err, LlmError::InvalidRequest { .. }));
        assert!(!err.is_retryable());

        let err = parse_http_error(429, "rate limited", "mint");
        assert!(matches!(err, LlmError::RateLimited { .. }));

        let err = parse_http_error(503, "unavailable", "mint");
        assert!(matches!(err, LlmError::ServerError { status: Some(503), .. }));
        assert!(err.is_retryable());
    }
}
