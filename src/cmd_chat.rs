//! Chat, keyword and search commands.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use lightpilot_provider_xai::{ChatSession, CompletionOptions, compose_query, extract_keywords};

use crate::container::ContextContainer;

/// Page attached to a chat turn: the given file, else the last captured page.
async fn page_content(container: &ContextContainer, page: Option<&Path>) -> anyhow::Result<Option<String>> {
    match page {
        Some(path) => {
            let html = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            container.extractor.store_content(html.clone()).await?;
            Ok(Some(html))
        }
        None => Ok(container.app.state().webpage_content),
    }
}

pub(crate) async fn chat(
    container: &ContextContainer,
    text: &str,
    page: Option<&Path>,
    system: Option<String>,
    stream: bool,
    model: Option<String>,
) -> anyhow::Result<()> {
    let client = Arc::new(container.xai_client()?);
    let mut options = CompletionOptions::default();
    if let Some(model) = model {
        options = options.with_model(model);
    }

    let mut session = ChatSession::new(client).with_options(options);
    if let Some(system) = system {
        session = session.with_system_prompt(system);
    }
    if let Some(content) = page_content(container, page).await? {
        debug!("Attaching {} bytes of page content", content.len());
        session.attach_page(content);
    }

    if !stream {
        println!("{}", session.send_buffered(text).await?);
        return Ok(());
    }

    let mut printed = 0;
    let mut stdout = std::io::stdout();
    let result = session
        .send(text, |partial| {
            let _ = write!(stdout, "{}", &partial[printed..]);
            let _ = stdout.flush();
            printed = partial.len();
        })
        .await;
    println!();
    result?;
    Ok(())
}

pub(crate) async fn keywords(container: &ContextContainer, page: &Path) -> anyhow::Result<()> {
    let client = container.xai_client()?;
    let html = tokio::fs::read_to_string(page)
        .await
        .with_context(|| format!("reading {}", page.display()))?;

    let mut keywords = extract_keywords(&client, &html).await?;
    if keywords.is_empty() {
        println!("No keywords found");
        return Ok(());
    }

    for keyword in &mut keywords {
        keyword.toggle();
        println!("- {}", keyword.text);
    }
    println!("\nQuery: {}", compose_query(&keywords, ""));
    Ok(())
}

pub(crate) async fn search(
    container: &ContextContainer,
    query: &str,
    max_results: u32,
) -> anyhow::Result<()> {
    let response = container.x_client().search_recent(query, max_results).await?;
    if response.data.is_empty() {
        println!("No posts found");
        return Ok(());
    }

    for post in &response.data {
        let author = response
            .author_of(post)
            .map(|a| format!("@{}", a.username))
            .unwrap_or_else(|| "unknown".to_string());
        println!("{}: {}", author, post.text);
    }
    Ok(())
}
