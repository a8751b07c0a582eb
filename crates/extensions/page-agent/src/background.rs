//! Message handler of the background context.

use std::sync::Arc;

use tracing::{debug, error, info};

use lightpilot_core::{Dispatch, MessageBus, MessageHandler, Responder};
use lightpilot_protocols::{Envelope, Message, Reply, Target};

use crate::driver::UiDriver;
use crate::extractor::PageContentExtractor;

pub const STORE_SUCCESS: &str = "success";

/// Routes background-addressed messages to the extractor and the driver.
pub struct BackgroundService {
    extractor: Arc<PageContentExtractor>,
    driver: Arc<UiDriver>,
}

impl BackgroundService {
    pub fn new(extractor: Arc<PageContentExtractor>, driver: Arc<UiDriver>) -> Self {
        Self { extractor, driver }
    }

    pub fn register(self: Arc<Self>, bus: &MessageBus) {
        bus.register(Target::Background, self);
    }
}

impl MessageHandler for BackgroundService {
    fn handle(&self, envelope: &Envelope, responder: Responder) -> Dispatch {
        match &envelope.message {
            Message::GetPageContent => {
                let extractor = self.extractor.clone();
                tokio::spawn(async move {
                    let reply = match extractor.extract().await {
                        Ok(content) => Reply::content(content),
                        Err(e) => Reply::from(&e),
                    };
                    let _ = responder.respond(reply);
                });
                Dispatch::Deferred
            }
            Message::StoreWebpageContent { content } => {
                let extractor = self.extractor.clone();
                let content = content.clone();
                tokio::spawn(async move {
                    let reply = match extractor.store_content(content).await {
                        Ok(()) => Reply::status(STORE_SUCCESS),
                        Err(e) => {
                            error!("Failed to store page content: {}", e);
                            Reply::from(&e)
                        }
                    };
                    let _ = responder.respond(reply);
                });
                Dispatch::Deferred
            }
            Message::BuildWithAgent { prompt } => {
                info!("Build requested by {}", envelope.sender);
                if let Err(e) = self.driver.build_with_agent(prompt) {
                    error!("Could not start build flow: {}", e);
                }
                Dispatch::Ignored
            }
            Message::ContentScriptInjected => {
                info!("Content script injected in {}", envelope.sender);
                Dispatch::Ignored
            }
            other => {
                debug!("Background ignoring {}", other.action());
                Dispatch::Ignored
            }
        }
    }
}

#[cfg(test)]
#[path = "background_tests.rs"]
mod tests;
