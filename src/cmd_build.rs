//! Agent build command.

use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::container::ContextContainer;

const PAGE_LOAD_ALLOWANCE: Duration = Duration::from_secs(30);

/// Run the build flow to completion.
pub(crate) async fn build(container: &ContextContainer, prompt: &str) -> anyhow::Result<()> {
    let flow = container.driver.build_with_agent(prompt)?;
    info!("Opened {} at {}", flow.tab().id, flow.tab().url);

    let agent = &container.config.agent;
    let limit = PAGE_LOAD_ALLOWANCE
        + Duration::from_millis(
            agent.settle_delay_ms + agent.poll_timeout_ms + container.config.bus.reply_timeout_ms,
        );
    let outcome = tokio::time::timeout(limit, flow.outcome())
        .await
        .context("build flow did not finish")??;

    if outcome.success {
        println!("{}", outcome.message);
        Ok(())
    } else {
        anyhow::bail!("{}", outcome.message)
    }
}
