//! Browser tab handles and lifecycle events.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// Load status of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Loading,
    Complete,
}

/// A tab created or observed by the background context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabHandle {
    pub id: TabId,
    pub url: String,
    pub status: TabStatus,
}

impl TabHandle {
    pub fn new(id: TabId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            status: TabStatus::Loading,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == TabStatus::Complete
    }
}

/// Lifecycle notification emitted by the tab registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    /// Status changed (including a reload back to `loading`).
    Updated { tab_id: TabId, status: TabStatus },
    /// Tab was closed; its content agent is gone.
    Removed { tab_id: TabId },
}

impl TabEvent {
    pub fn tab_id(&self) -> TabId {
        match self {
            TabEvent::Updated { tab_id, .. } | TabEvent::Removed { tab_id } => *tab_id,
        }
    }
}
