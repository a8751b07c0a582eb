//! Content agent injected into each tab.
//!
//! Serves `getPageContent` from the tab's document and drives the build
//! control on `clickStartBuilding`.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lightpilot_core::{Dispatch, MessageBus, MessageHandler, Responder};
use lightpilot_protocols::{
    ContextId, ControlRef, DriveError, Envelope, InteractionEvent, Message, PageDocument, Reply,
    TabId, Target,
};

pub const CLICK_SUCCEEDED: &str = "Button clicked successfully";
pub const CLICK_FAILED: &str = "Failed to click button";

/// How the agent locates and activates the build control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveSettings {
    pub control_selector: String,
    /// Fixed wait before the first lookup.
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    /// Give up when the control has not appeared after this long.
    pub poll_timeout: Duration,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            control_selector: r#"button[data-cy="ai-prompt-submit"]"#.to_string(),
            settle_delay: Duration::ZERO,
            poll_interval: Duration::from_millis(100),
            poll_timeout: Duration::from_secs(5),
        }
    }
}

/// Per-tab agent with access to the tab's document.
#[derive(Clone)]
pub struct ContentAgent {
    tab_id: TabId,
    document: Arc<dyn PageDocument>,
    settings: DriveSettings,
}

impl ContentAgent {
    pub fn new(tab_id: TabId, document: Arc<dyn PageDocument>, settings: DriveSettings) -> Self {
        Self {
            tab_id,
            document,
            settings,
        }
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Listen on the tab's endpoint and announce the injection to the
    /// background context.
    pub fn attach(self: Arc<Self>, bus: &MessageBus) {
        let tab_id = self.tab_id;
        bus.register(Target::Tab(tab_id), self);
        debug!("Content agent attached to {}", tab_id);
        bus.post(
            ContextId::Tab(tab_id),
            Target::Background,
            Message::ContentScriptInjected,
        );
    }

    /// Locate the build control and dispatch a click to it.
    pub async fn click_start_building(&self, cancel: CancellationToken) -> Result<ControlRef, DriveError> {
        if !self.settings.settle_delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(DriveError::Cancelled),
                _ = tokio::time::sleep(self.settings.settle_delay) => {}
            }
        }

        let control = wait_for_control(
            self.document.as_ref(),
            &self.settings.control_selector,
            self.settings.poll_interval,
            self.settings.poll_timeout,
            &cancel,
        )
        .await?;

        if !self.document.dispatch(&control, InteractionEvent::click()) {
            debug!("Page prevented the default action of the build control");
        }
        Ok(control)
    }
}

impl MessageHandler for ContentAgent {
    fn handle(&self, envelope: &Envelope, responder: Responder) -> Dispatch {
        match envelope.message {
            Message::GetPageContent => {
                let html = self.document.outer_html();
                debug!("{} serving {} bytes of page content", self.tab_id, html.len());
                let _ = responder.respond(Reply::content(html));
                Dispatch::Replied
            }
            Message::ClickStartBuilding => {
                let agent = self.clone();
                tokio::spawn(async move {
                    let reply = match agent.click_start_building(responder.cancellation()).await {
                        Ok(control) => {
                            info!("{} clicked <{}> \"{}\"", agent.tab_id, control.tag, control.text);
                            Reply::outcome(true, CLICK_SUCCEEDED)
                        }
                        Err(DriveError::Cancelled) => {
                            debug!("{} unloaded before the build control was clicked", agent.tab_id);
                            return;
                        }
                        Err(e) => {
                            warn!("{}: {}", agent.tab_id, e);
                            Reply::outcome(false, CLICK_FAILED)
                        }
                    };
                    let _ = responder.respond(reply);
                });
                Dispatch::Deferred
            }
            _ => Dispatch::Ignored,
        }
    }
}

/// Poll `document` for `selector` every `interval` until it matches or
/// `timeout` elapses.
pub async fn wait_for_control(
    document: &dyn PageDocument,
    selector: &str,
    interval: Duration,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ControlRef, DriveError> {
    let start = Instant::now();

    loop {
        if let Some(control) = document.query_selector(selector) {
            return Ok(control);
        }

        if start.elapsed() >= timeout {
            return Err(DriveError::ControlNotFound(selector.to_string()));
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(DriveError::Cancelled),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
#[path = "content_tests.rs"]
mod tests;
