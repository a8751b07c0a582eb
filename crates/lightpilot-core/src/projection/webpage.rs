//! Captured page content flowing into the application state.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use lightpilot_protocols::{Message, StateStore, StoreError, StoreKey};

use super::{AppAction, AppReducer, Projection};

/// Apply `UPDATE_WEBPAGE_CONTENT` broadcasts to `projection` until `cancel`
/// fires or the bus goes away.
pub fn follow_webpage_updates(
    projection: Arc<Projection<AppReducer>>,
    mut updates: broadcast::Receiver<Message>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = updates.recv() => received,
            };

            match received {
                Ok(Message::UpdateWebpageContent { content }) => {
                    debug!("Webpage content updated ({} bytes)", content.len());
                    projection.dispatch(AppAction::SetWebpageContent(content));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Missed {} broadcast(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Refresh the projection from the stored `webpageContent` record.
pub async fn load_webpage_content(
    projection: &Projection<AppReducer>,
    store: &dyn StateStore,
) -> Result<Option<String>, StoreError> {
    let content = match store.get(StoreKey::WebpageContent).await? {
        Some(serde_json::Value::String(content)) => content,
        Some(other) => {
            warn!("Ignoring non-text webpageContent record: {}", other);
            return Ok(None);
        }
        None => return Ok(None),
    };

    projection.dispatch(AppAction::SetWebpageContent(content.clone()));
    Ok(Some(content))
}
