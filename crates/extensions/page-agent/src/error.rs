//! Page loading errors.

use thiserror::Error;

/// Failure to load a document into a tab.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Non-2xx answer from the page's server.
    #[error("HTTP error loading {url}: status {status}")]
    Http { url: String, status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    /// No document is known for this URL.
    #[error("Page not found: {0}")]
    PageNotFound(String),
}

impl From<reqwest::Error> for LoadError {
    fn from(e: reqwest::Error) -> Self {
        LoadError::Network(e.to_string())
    }
}
