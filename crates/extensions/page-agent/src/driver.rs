//! Automated build flow: open the agent page with a prompt and press its
//! build control once the page has loaded.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use url::Url;

use lightpilot_core::{CompletionListener, ListenerHandle, MessageBus, TabRegistry};
use lightpilot_protocols::{ContextId, DriveError, Message, Reply, TabHandle, TabId, Target};

/// Result reported by the tab's content agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveOutcome {
    pub tab_id: TabId,
    pub success: bool,
    pub message: String,
}

/// Starts build flows in new tabs.
pub struct UiDriver {
    bus: Arc<MessageBus>,
    tabs: Arc<TabRegistry>,
    build_url: String,
}

impl UiDriver {
    pub fn new(bus: Arc<MessageBus>, tabs: Arc<TabRegistry>, build_url: impl Into<String>) -> Self {
        Self {
            bus,
            tabs,
            build_url: build_url.into(),
        }
    }

    /// Target URL for `prompt`, carried as the `prompt` query parameter.
    pub fn target_url(&self, prompt: &str) -> Result<Url, DriveError> {
        Url::parse_with_params(&self.build_url, [("prompt", prompt)])
            .map_err(|e| DriveError::InvalidUrl(format!("{}: {}", self.build_url, e)))
    }

    /// Open the agent page and, on its first load completion, ask its content
    /// agent to click the build control. Failures are logged, never retried.
    pub fn build_with_agent(&self, prompt: &str) -> Result<DriveFlow, DriveError> {
        let url = self.target_url(prompt)?;
        let (tab, listener) = self.tabs.create_with_listener(url.as_str());
        let handle = listener.handle();

        let task = tokio::spawn(drive(self.bus.clone(), listener));

        Ok(DriveFlow {
            tab,
            listener: handle,
            task,
        })
    }
}

async fn drive(bus: Arc<MessageBus>, listener: CompletionListener) -> Result<DriveOutcome, DriveError> {
    let loaded = listener.wait().await?;
    info!("{} finished loading, clicking the build control", loaded.id);

    let reply = bus
        .request(
            ContextId::Background,
            Target::Tab(loaded.id),
            Message::ClickStartBuilding,
        )
        .await
        .inspect_err(|e| error!("Error clicking button: {}", e))?;

    match reply {
        Reply::Outcome { success, message } => {
            if success {
                info!("{}: {}", loaded.id, message);
            } else {
                warn!("{}: {}", loaded.id, message);
            }
            Ok(DriveOutcome {
                tab_id: loaded.id,
                success,
                message,
            })
        }
        other => {
            error!("Unexpected reply to clickStartBuilding: {:?}", other);
            Err(DriveError::UnexpectedReply(format!("{:?}", other)))
        }
    }
}

/// A running build flow.
pub struct DriveFlow {
    tab: TabHandle,
    listener: ListenerHandle,
    task: JoinHandle<Result<DriveOutcome, DriveError>>,
}

impl DriveFlow {
    pub fn tab(&self) -> &TabHandle {
        &self.tab
    }

    /// Abandon the flow. Returns `false` if the page had already loaded.
    pub fn cancel(&self) -> bool {
        let removed = self.listener.remove();
        if removed {
            info!("Build flow for {} cancelled", self.tab.id);
        }
        removed
    }

    pub async fn outcome(self) -> Result<DriveOutcome, DriveError> {
        self.task.await.unwrap_or(Err(DriveError::Cancelled))
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
