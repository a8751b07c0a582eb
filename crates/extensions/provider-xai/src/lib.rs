//! Chat-completion provider for LightPilot.
//!
//! Talks to an OpenAI-compatible `chat/completions` endpoint, either
//! buffered or as a stream of server-sent events decoded into text deltas.

mod api;
mod client;
mod keywords;
mod session;
mod sse;
mod stream;

pub use api::{ChatCompletion, CompletionOptions};
pub use client::{DEFAULT_API_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE, XAiClient, ensure_system_prompt};
pub use keywords::{Keyword, compose_query, extract_keywords, parse_keywords};
pub use session::ChatSession;
pub use sse::{SseDecoder, SseEvent};
pub use stream::{DeltaStream, StreamAccumulator};
