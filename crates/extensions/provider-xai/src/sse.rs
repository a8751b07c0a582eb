//! Server-sent-event frame decoding for streamed completions.

use tracing::{trace, warn};

use lightpilot_protocols::ProviderError;

use crate::api::StreamChunk;

const DATA_MARKER: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// A decoded stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Delta(String),
    Done,
}

/// Incremental decoder over raw body chunks.
///
/// Bytes are buffered until a `\n` arrives, so lines and multi-byte
/// characters split across chunks are reassembled before decoding.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
    malformed: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the sentinel frame has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of frames skipped because they did not parse.
    pub fn malformed_frames(&self) -> usize {
        self.malformed
    }

    /// Feed one body chunk and return the events it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = self.decode_line(&line[..line.len() - 1]) {
                let done = event == SseEvent::Done;
                events.push(event);
                if done {
                    self.done = true;
                    self.buffer.clear();
                    break;
                }
            }
        }
        events
    }

    /// Decode whatever is left once the body has ended.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        if self.done || self.buffer.is_empty() {
            self.buffer.clear();
            return Vec::new();
        }
        let line = std::mem::take(&mut self.buffer);
        let event = self.decode_line(&line);
        if event == Some(SseEvent::Done) {
            self.done = true;
        }
        event.into_iter().collect()
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<SseEvent> {
        let text = String::from_utf8_lossy(raw);
        let line = text.strip_suffix('\r').unwrap_or(text.as_ref());

        let data = line.strip_prefix(DATA_MARKER)?;
        let data = data.strip_prefix(' ').unwrap_or(data);

        if data == DONE_SENTINEL {
            return Some(SseEvent::Done);
        }

        let event = match serde_json::from_str::<StreamChunk>(data) {
            Ok(chunk) => chunk.delta_content().map(SseEvent::Delta),
            Err(e) => {
                self.malformed += 1;
                let err = ProviderError::MalformedFrame(format!("{} ({})", data, e));
                warn!("Skipping stream frame: {}", err);
                None
            }
        };
        if let Some(event) = &event {
            trace!("SSE event: {:?}", event);
        }
        event
    }
}

#[cfg(test)]
#[path = "sse_tests.rs"]
mod tests;
