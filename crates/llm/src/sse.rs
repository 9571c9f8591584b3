//! Event-Stream Record Framing
//!
//! Splits the backend's byte stream into complete records. A record is a run
//! of `field: value` lines terminated by a blank line; only `event` and `data`
//! fields are meaningful here. Nothing is emitted until the terminating blank
//! line arrives, so a record split across network chunks is never dispatched
//! half-read and records are always yielded in arrival order.

use mint_ai_core::{AdapterError, SessionStreamEvent};

/// One complete record from the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseRecord {
    pub event: Option<String>,
    pub data: String,
}

impl SseRecord {
    /// Event name, defaulting to `message` when no `event:` line was present.
    pub fn event_name(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }

    /// Decode the record into a typed session event.
    pub fn decode(&self) -> Result<SessionStreamEvent, AdapterError> {
        SessionStreamEvent::from_wire(self.event_name(), &self.data)
    }
}

/// Incremental record decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of a UTF-8 sequence cut off at a chunk boundary
    pending_bytes: Vec<u8>,
    /// Decoded text not yet terminated by a newline
    text: String,
    event: Option<String>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes; returns every record completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseRecord> {
        self.pending_bytes.extend_from_slice(chunk);
        self.decode_utf8();

        let mut records = Vec::new();
        while let Some(line_end) = self.text.find('\n') {
            let line: String = self.text.drain(..=line_end).collect();
            let line = line.trim_end_matches('\n').trim_end_matches('\r');
            if let Some(record) = self.handle_line(line) {
                records.push(record);
            }
        }
        records
    }

    /// Flush whatever is buffered at end of stream.
    ///
    /// A trailing record without its blank-line terminator is still returned.
    pub fn finish(&mut self) -> Option<SseRecord> {
        if !self.pending_bytes.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending_bytes).into_owned();
            self.text.push_str(&rest);
            self.pending_bytes.clear();
        }
        let tail = std::mem::take(&mut self.text);
        let tail = tail.trim_end_matches('\r');
        if !tail.is_empty() {
            if let Some(record) = self.handle_line(tail) {
                return Some(record);
            }
        }
        self.take_record()
    }

    fn decode_utf8(&mut self) {
        loop {
            match std::str::from_utf8(&self.pending_bytes) {
                Ok(s) => {
                    self.text.push_str(s);
                    self.pending_bytes.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    let prefix = String::from_utf8_lossy(&self.pending_bytes[..valid]).into_owned();
                    self.text.push_str(&prefix);
                    match e.error_len() {
                        Some(bad) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.pending_bytes.drain(..valid + bad);
                        }
                        None => {
                            // Incomplete sequence at the tail; wait for more bytes.
                            self.pending_bytes.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn handle_line(&mut self, line: &str) -> Option<SseRecord> {
        if line.is_empty() {
            return self.take_record();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                (&line[..idx], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.trim().to_string()),
            "data" => self.data_lines.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn take_record(&mut self) -> Option<SseRecord> {
        if self.event.is_none() && self.data_lines.is_empty() {
            return None;
        }
        Some(SseRecord {
            event: self.event.take(),
            data: std::mem::take(&mut self.data_lines).join("\n"),
        })
    }
}
