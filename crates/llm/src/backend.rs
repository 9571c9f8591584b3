//! HTTP Generation Backend
//!
//! POSTs the turn request as JSON and hands back the `text/event-stream`
//! response body as a byte stream.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use url::Url;

use super::http_client::build_http_client;
use super::provider::{parse_http_error, ByteStream, GenerationBackend};
use super::types::{GenerationRequest, LlmError, LlmResult};

/// Backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGenerationBackend {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpGenerationBackend {
    /// Create a backend for `base_url` joined with `generate_path`.
    pub fn new(base_url: &str, generate_path: &str, connect_timeout: Duration) -> LlmResult<Self> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join(generate_path))
            .map_err(|e| LlmError::Configuration {
                message: format!("invalid backend url {base_url}{generate_path}: {e}"),
            })?;
        Ok(Self {
            client: build_http_client(connect_timeout)?,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn open_stream(&self, request: &GenerationRequest) -> LlmResult<ByteStream> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok());
            let body_text = response.text().await.unwrap_or_default();
            let mut err = parse_http_error(status.as_u16(), &body_text, self.name());
            if let LlmError::RateLimited {
                retry_after: ref mut slot,
                ..
            } = err
            {
                *slot = retry_after;
            }
            return Err(err);
        }

        tracing::debug!(endpoint = %self.endpoint, "generation stream opened");
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| LlmError::network(e.to_string())));
        Ok(Box::pin(stream))
    }
}
