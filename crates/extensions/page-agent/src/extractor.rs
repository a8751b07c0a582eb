//! Captures the active page's content into the state store.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use lightpilot_core::{MessageBus, TabRegistry};
use lightpilot_protocols::{
    ContextId, ExtractionError, Message, Reply, StateStore, StoreKey, TabId, Target,
};

/// Progress of the most recent extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionState {
    Idle,
    Requesting { tab_id: TabId },
    Received { tab_id: TabId, bytes: usize },
    Failed { reason: String },
}

/// Requests page content from the active tab's content agent, persists it
/// under `webpageContent` and broadcasts `UPDATE_WEBPAGE_CONTENT`.
///
/// A failed extraction writes nothing.
pub struct PageContentExtractor {
    bus: Arc<MessageBus>,
    tabs: Arc<TabRegistry>,
    store: Arc<dyn StateStore>,
    state: Mutex<ExtractionState>,
}

impl PageContentExtractor {
    pub fn new(bus: Arc<MessageBus>, tabs: Arc<TabRegistry>, store: Arc<dyn StateStore>) -> Self {
        Self {
            bus,
            tabs,
            store,
            state: Mutex::new(ExtractionState::Idle),
        }
    }

    pub fn state(&self) -> ExtractionState {
        self.state.lock().clone()
    }

    /// Fetch, store and announce the active tab's content.
    pub async fn extract(&self) -> Result<String, ExtractionError> {
        let result = self.try_extract().await;
        if let Err(e) = &result {
            warn!("Page content extraction failed: {}", e);
            *self.state.lock() = ExtractionState::Failed {
                reason: e.to_string(),
            };
        }
        result
    }

    async fn try_extract(&self) -> Result<String, ExtractionError> {
        let tab = self.tabs.active().ok_or(ExtractionError::NoActiveTab)?;
        *self.state.lock() = ExtractionState::Requesting { tab_id: tab.id };
        debug!("Requesting page content from {}", tab.id);

        let reply = self
            .bus
            .request(ContextId::Background, Target::Tab(tab.id), Message::GetPageContent)
            .await?;

        let content = match reply {
            Reply::Content { content } => content,
            Reply::Error { error } => return Err(ExtractionError::ContentUnavailable(error)),
            other => {
                return Err(ExtractionError::ContentUnavailable(format!(
                    "unexpected reply {:?}",
                    other
                )));
            }
        };

        self.publish(&content).await?;
        *self.state.lock() = ExtractionState::Received {
            tab_id: tab.id,
            bytes: content.len(),
        };
        Ok(content)
    }

    /// Persist `content` as the captured page, then broadcast it.
    pub async fn store_content(&self, content: String) -> Result<(), ExtractionError> {
        self.publish(&content).await
    }

    async fn publish(&self, content: &str) -> Result<(), ExtractionError> {
        self.store
            .set(
                StoreKey::WebpageContent,
                serde_json::Value::String(content.to_string()),
            )
            .await?;

        let reached = self.bus.broadcast(Message::UpdateWebpageContent {
            content: content.to_string(),
        });
        info!(
            "Stored {} bytes of page content, notified {} listener(s)",
            content.len(),
            reached
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;
