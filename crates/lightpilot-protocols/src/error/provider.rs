//! Completion and search provider errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Non-2xx answer from an external HTTP API.
    #[error("HTTP error! status: {status}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    /// Body read failure after streaming started.
    #[error("Stream error: {0}")]
    StreamError(String),

    /// One unparseable frame inside an otherwise healthy stream.
    #[error("Malformed stream frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

impl ProviderError {
    /// HTTP status for [`ProviderError::Http`].
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
