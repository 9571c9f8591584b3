//! Replay Backend
//!
//! Plays back a recorded event-stream transcript instead of calling a live
//! backend. Used by the `replay` CLI command and by tests.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::provider::{ByteStream, GenerationBackend};
use super::types::{GenerationRequest, LlmResult};

/// Backend that returns the same pre-recorded chunks for every request.
#[derive(Debug, Default)]
pub struct ReplayBackend {
    chunks: Vec<Bytes>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ReplayBackend {
    /// Replay `chunks` exactly as given, one network chunk each.
    pub fn from_chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replay a whole transcript, cut into chunks of `chunk_size` bytes.
    ///
    /// Cuts ignore record and UTF-8 boundaries on purpose, like a real network.
    pub fn from_transcript(transcript: &str, chunk_size: usize) -> Self {
        let size = chunk_size.max(1);
        let chunks: Vec<Bytes> = transcript
            .as_bytes()
            .chunks(size)
            .map(Bytes::copy_from_slice)
            .collect();
        Self::from_chunks(chunks)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GenerationBackend for ReplayBackend {
    fn name(&self) -> &'static str {
        "replay"
    }

    async fn open_stream(&self, request: &GenerationRequest) -> LlmResult<ByteStream> {
        if let Ok(mut guard) = self.requests.lock() {
            guard.push(request.clone());
        }
        let items: Vec<LlmResult<Bytes>> = self.chunks.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures_util::stream::iter(items)))
    }
}
