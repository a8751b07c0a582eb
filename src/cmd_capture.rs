//! Page capture command.

use std::time::Duration;

use anyhow::Context;
use tracing::info;

use lightpilot_protocols::{ContextId, Message, Reply, Target};

use crate::container::ContextContainer;

const PAGE_LOAD_ALLOWANCE: Duration = Duration::from_secs(30);

/// Open `url` in a new active tab and ask the background context for its
/// content. The captured page is stored and broadcast like any other
/// extraction. Returns the captured content.
pub(crate) async fn capture(container: &ContextContainer, url: &str) -> anyhow::Result<String> {
    let (tab, listener) = container.tabs.create_with_listener(url);
    info!("Opened {} at {}", tab.id, tab.url);

    tokio::time::timeout(PAGE_LOAD_ALLOWANCE, listener.wait())
        .await
        .with_context(|| format!("{} did not finish loading", url))??;

    let reply = container
        .bus
        .request(
            ContextId::Ui("cli".to_string()),
            Target::Background,
            Message::GetPageContent,
        )
        .await?;

    match reply {
        Reply::Content { content } => Ok(content),
        Reply::Error { error } => anyhow::bail!("capture failed: {}", error),
        other => anyhow::bail!("unexpected reply {:?}", other),
    }
}

/// Capture `url` and report what was stored.
pub(crate) async fn run(container: &ContextContainer, url: &str) -> anyhow::Result<()> {
    let content = capture(container, url).await?;
    println!("Captured {} bytes from {}", content.len(), url);
    Ok(())
}
