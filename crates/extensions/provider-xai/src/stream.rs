//! Lazy sequence of text deltas over a streamed response body.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use futures::StreamExt;
use tracing::{debug, warn};

use lightpilot_protocols::ProviderError;

use crate::sse::{SseDecoder, SseEvent};

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, String>> + Send>>;

/// Text deltas in arrival order.
///
/// Ends after the `[DONE]` sentinel or the end of the body. A body read error
/// yields a single [`ProviderError::StreamError`] and ends the stream; deltas
/// already yielded stay valid. Not restartable.
pub struct DeltaStream {
    body: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

impl DeltaStream {
    /// Wrap any source of body chunks.
    pub fn from_bytes<S, E>(body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: fmt::Display,
    {
        Self {
            body: Box::pin(body.map(|chunk| chunk.map_err(|e| e.to_string()))),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        Self::from_bytes(response.bytes_stream())
    }

    fn absorb(&mut self, events: Vec<SseEvent>) {
        for event in events {
            match event {
                SseEvent::Delta(delta) => self.pending.push_back(delta),
                SseEvent::Done => {
                    debug!("Stream reached sentinel");
                    self.finished = true;
                }
            }
        }
    }

    /// Drain the stream into one string, failing on the first error.
    pub async fn collect_text(mut self) -> Result<String, ProviderError> {
        let mut accumulator = StreamAccumulator::new();
        while let Some(delta) = self.next().await {
            accumulator.push(&delta?);
        }
        Ok(accumulator.into_text())
    }
}

impl Stream for DeltaStream {
    type Item = Result<String, ProviderError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(delta) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(delta)));
            }
            if self.finished {
                return Poll::Ready(None);
            }

            match self.body.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    let events = self.decoder.push(&chunk);
                    self.absorb(events);
                }
                Poll::Ready(Some(Err(e))) => {
                    warn!("Stream read failed: {}", e);
                    self.finished = true;
                    return Poll::Ready(Some(Err(ProviderError::StreamError(e))));
                }
                Poll::Ready(None) => {
                    let events = self.decoder.finish();
                    self.absorb(events);
                    self.finished = true;
                }
            }
        }
    }
}

/// Assistant text built up from deltas.
#[derive(Debug, Default, Clone)]
pub struct StreamAccumulator {
    text: String,
    deltas: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and return the text so far.
    pub fn push(&mut self, delta: &str) -> &str {
        self.text.push_str(delta);
        self.deltas += 1;
        &self.text
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn deltas(&self) -> usize {
        self.deltas
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunk(s: &str) -> Result<Bytes, String> {
        Ok(Bytes::from(s.to_string()))
    }

    const HE: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"He\"}}]}\n";
    const LLO: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n";

    #[tokio::test]
    async fn test_yields_deltas_in_order() {
        let body = stream::iter(vec![chunk(HE), chunk(LLO), chunk("data: [DONE]\n")]);
        let deltas: Vec<_> = DeltaStream::from_bytes(body)
            .map(|d| d.unwrap())
            .collect()
            .await;
        assert_eq!(deltas, vec!["He", "llo"]);
    }

    #[tokio::test]
    async fn test_ends_at_sentinel_even_if_body_continues() {
        let body = stream::iter(vec![
            chunk(HE),
            chunk("data: [DONE]\n"),
            chunk(LLO),
        ]);
        let text = DeltaStream::from_bytes(body).collect_text().await.unwrap();
        assert_eq!(text, "He");
    }

    #[tokio::test]
    async fn test_ends_at_body_end_without_sentinel() {
        let body = stream::iter(vec![chunk(HE), chunk(LLO.trim_end())]);
        let text = DeltaStream::from_bytes(body).collect_text().await.unwrap();
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn test_read_error_terminates_after_partial_text() {
        let body = stream::iter(vec![
            chunk(HE),
            Err("connection reset".to_string()),
            chunk(LLO),
        ]);
        let mut stream = DeltaStream::from_bytes(body);

        assert_eq!(stream.next().await.unwrap().unwrap(), "He");
        match stream.next().await {
            Some(Err(ProviderError::StreamError(msg))) => assert!(msg.contains("reset")),
            other => panic!("Expected stream error, got {:?}", other),
        }
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_accumulator_grows_monotonically() {
        let mut acc = StreamAccumulator::new();
        assert!(acc.is_empty());
        assert_eq!(acc.push("He"), "He");
        assert_eq!(acc.push("llo"), "Hello");
        assert_eq!(acc.deltas(), 2);
        assert_eq!(acc.into_text(), "Hello");
    }
}
