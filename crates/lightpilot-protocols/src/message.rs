//! Cross-context message vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tab::TabId;

/// An addressed unit of communication between contexts.
///
/// Serialized with the `action` tag next to the payload fields, matching the
/// wire shape `{"action": "buildWithAgent", "prompt": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum Message {
    /// Ask a content agent (or the background on the UI's behalf) for the page HTML.
    #[serde(rename = "getPageContent")]
    GetPageContent,

    /// Ask a content agent to locate and activate the build control.
    #[serde(rename = "clickStartBuilding")]
    ClickStartBuilding,

    /// Notice from a freshly injected content agent.
    #[serde(rename = "contentScriptInjected")]
    ContentScriptInjected,

    /// Persist captured page content and fan it out to UI surfaces.
    #[serde(rename = "STORE_WEBPAGE_CONTENT")]
    StoreWebpageContent { content: String },

    /// Broadcast: captured page content changed.
    #[serde(rename = "UPDATE_WEBPAGE_CONTENT")]
    UpdateWebpageContent { content: String },

    /// Open the agent page with a prompt and drive its build control.
    #[serde(rename = "buildWithAgent")]
    BuildWithAgent { prompt: String },
}

impl Message {
    /// The wire tag of this message.
    pub fn action(&self) -> &'static str {
        match self {
            Message::GetPageContent => "getPageContent",
            Message::ClickStartBuilding => "clickStartBuilding",
            Message::ContentScriptInjected => "contentScriptInjected",
            Message::StoreWebpageContent { .. } => "STORE_WEBPAGE_CONTENT",
            Message::UpdateWebpageContent { .. } => "UPDATE_WEBPAGE_CONTENT",
            Message::BuildWithAgent { .. } => "buildWithAgent",
        }
    }

    /// Whether the sender of this message waits for a [`Reply`].
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            Message::GetPageContent
                | Message::ClickStartBuilding
                | Message::StoreWebpageContent { .. }
        )
    }
}

/// Response to a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Content { content: String },
    Outcome { success: bool, message: String },
    Status { status: String },
    Error { error: String },
}

impl Reply {
    pub fn content(content: impl Into<String>) -> Self {
        Reply::Content {
            content: content.into(),
        }
    }

    pub fn status(status: impl Into<String>) -> Self {
        Reply::Status {
            status: status.into(),
        }
    }

    pub fn outcome(success: bool, message: impl Into<String>) -> Self {
        Reply::Outcome {
            success,
            message: message.into(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Reply::Error {
            error: error.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error { .. })
    }
}

/// The execution context a message originates from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContextId {
    Background,
    Tab(TabId),
    Ui(String),
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextId::Background => write!(f, "background"),
            ContextId::Tab(id) => write!(f, "{}", id),
            ContextId::Ui(name) => write!(f, "ui:{}", name),
        }
    }
}

/// Point-to-point destination on the message bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Background,
    Tab(TabId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Background => write!(f, "background"),
            Target::Tab(id) => write!(f, "{}", id),
        }
    }
}

/// A message together with its implicit sender.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub message: Message,
    pub sender: ContextId,
}

impl Envelope {
    pub fn new(message: Message, sender: ContextId) -> Self {
        Self { message, sender }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
