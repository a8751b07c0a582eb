//! Page-content extraction and UI-drive errors.

use thiserror::Error;

use super::{BusError, StoreError};
use crate::message::Reply;

/// Failure to capture the active page's content.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("No active tab found")]
    NoActiveTab,

    #[error("Page content unavailable: {0}")]
    ContentUnavailable(String),

    #[error(transparent)]
    Transport(#[from] BusError),

    #[error("Failed to store page content: {0}")]
    Store(#[from] StoreError),
}

impl From<&ExtractionError> for Reply {
    fn from(err: &ExtractionError) -> Self {
        Reply::error(err.to_string())
    }
}

/// Failure of the automated UI-drive flow.
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Control not found: {0}")]
    ControlNotFound(String),

    #[error("Invalid target URL: {0}")]
    InvalidUrl(String),

    #[error("Tab {0} closed before it finished loading")]
    TabClosed(String),

    #[error("Drive flow cancelled")]
    Cancelled,

    #[error(transparent)]
    Transport(#[from] BusError),

    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}
