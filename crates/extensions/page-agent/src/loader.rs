//! Page loaders used by the navigator to materialise a tab's document.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use lightpilot_protocols::PageDocument;

use crate::document::StaticDocument;
use crate::error::LoadError;

/// Produces the document for a URL.
#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<Arc<dyn PageDocument>, LoadError>;
}

/// Fetches pages over HTTP.
pub struct HttpPageLoader {
    client: reqwest::Client,
}

impl HttpPageLoader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpPageLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageLoader for HttpPageLoader {
    async fn load(&self, url: &str) -> Result<Arc<dyn PageDocument>, LoadError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(LoadError::Http {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let html = response.text().await?;
        Ok(Arc::new(StaticDocument::parse(url, html)))
    }
}

/// Serves preregistered documents, matched by URL prefix. The longest
/// matching prefix wins.
#[derive(Default)]
pub struct StaticPageLoader {
    pages: RwLock<HashMap<String, Arc<StaticDocument>>>,
}

impl StaticPageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, prefix: impl Into<String>, document: Arc<StaticDocument>) {
        self.pages.write().insert(prefix.into(), document);
    }

    fn lookup(&self, url: &str) -> Option<Arc<StaticDocument>> {
        self.pages
            .read()
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, doc)| doc.clone())
    }
}

#[async_trait]
impl PageLoader for StaticPageLoader {
    async fn load(&self, url: &str) -> Result<Arc<dyn PageDocument>, LoadError> {
        let document = self
            .lookup(url)
            .ok_or_else(|| LoadError::PageNotFound(url.to_string()))?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    #[tokio::test]
    async fn test_static_prefix_match() {
        let loader = StaticPageLoader::new();
        loader.insert(
            "https://replit.com/",
            Arc::new(StaticDocument::parse("https://replit.com/", "<p>home</p>")),
        );
        loader.insert(
            "https://replit.com/new",
            Arc::new(StaticDocument::parse("https://replit.com/new", "<p>new</p>")),
        );

        let doc = loader.load("https://replit.com/new/nix?tab=ai").await.unwrap();
        assert_eq!(doc.outer_html(), "<p>new</p>");

        let err = loader.load("https://example.com").await.err().unwrap();
        assert!(matches!(err, LoadError::PageNotFound(_)));
    }

    #[tokio::test]
    async fn test_http_load() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/agent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<button data-cy="ai-prompt-submit">Go</button>"#),
            )
            .mount(&server)
            .await;

        let url = format!("{}/agent", server.uri());
        let doc = HttpPageLoader::new().load(&url).await.unwrap();
        assert_eq!(doc.url(), url);
        assert!(doc.query_selector(r#"button[data-cy="ai-prompt-submit"]"#).is_some());
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = HttpPageLoader::new().load(&server.uri()).await.err().unwrap();
        assert!(matches!(err, LoadError::Http { status: 404, .. }));
    }
}
