//! Conversation state on top of [`XAiClient`].

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, warn};

use lightpilot_protocols::{ChatMessage, ProviderError};

use crate::api::CompletionOptions;
use crate::client::{XAiClient, ensure_system_prompt};
use crate::stream::StreamAccumulator;

/// One chat conversation.
///
/// When page content is attached, each user turn is prefixed with it.
/// Streaming turns report the growing assistant text after every delta.
pub struct ChatSession {
    client: Arc<XAiClient>,
    history: Vec<ChatMessage>,
    system_prompt: Option<String>,
    page_content: Option<String>,
    options: CompletionOptions,
}

impl ChatSession {
    pub fn new(client: Arc<XAiClient>) -> Self {
        Self {
            client,
            history: Vec::new(),
            system_prompt: None,
            page_content: None,
            options: CompletionOptions::default(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn attach_page(&mut self, content: impl Into<String>) {
        self.page_content = Some(content.into());
    }

    pub fn detach_page(&mut self) {
        self.page_content = None;
    }

    pub fn has_page(&self) -> bool {
        self.page_content.is_some()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    fn user_content(&self, input: &str) -> String {
        match &self.page_content {
            Some(content) => format!("Webpage content: {}\n{}", content, input),
            None => input.to_string(),
        }
    }

    fn begin_turn(&mut self, input: &str) -> Result<Vec<ChatMessage>, ProviderError> {
        if input.trim().is_empty() {
            return Err(ProviderError::InvalidRequest("empty message".to_string()));
        }
        let content = self.user_content(input);
        self.history.push(ChatMessage::user(content));

        Ok(match &self.system_prompt {
            Some(prompt) => ensure_system_prompt(&self.history, prompt),
            None => self.history.clone(),
        })
    }

    /// Streamed turn. `on_update` receives the full assistant text so far
    /// after each delta. On a mid-stream failure the partial text is kept in
    /// the history and the error is returned.
    pub async fn send<F>(&mut self, input: &str, mut on_update: F) -> Result<String, ProviderError>
    where
        F: FnMut(&str),
    {
        let messages = self.begin_turn(input)?;
        let mut stream = self.client.complete_stream(&messages, &self.options).await?;

        let mut accumulator = StreamAccumulator::new();
        let mut failure = None;
        while let Some(delta) = stream.next().await {
            match delta {
                Ok(delta) => on_update(accumulator.push(&delta)),
                Err(e) => {
                    warn!("Chat stream interrupted after {} delta(s): {}", accumulator.deltas(), e);
                    failure = Some(e);
                    break;
                }
            }
        }

        if !accumulator.is_empty() {
            self.history
                .push(ChatMessage::assistant(accumulator.text()));
        }
        debug!("Chat turn finished with {} delta(s)", accumulator.deltas());

        match failure {
            Some(e) => Err(e),
            None => Ok(accumulator.into_text()),
        }
    }

    /// Buffered turn.
    pub async fn send_buffered(&mut self, input: &str) -> Result<String, ProviderError> {
        let messages = self.begin_turn(input)?;
        let completion = self.client.complete(&messages, &self.options).await?;
        let text = completion
            .content()
            .ok_or_else(|| ProviderError::InvalidResponse("no message content".to_string()))?
            .to_string();
        self.history.push(ChatMessage::assistant(text.clone()));
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    const STREAM_BODY: &str = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"He\"}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n",
        "data: [DONE]\n",
    );

    async fn streaming_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(STREAM_BODY))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_progressive_updates() {
        let server = streaming_server().await;
        let client = Arc::new(XAiClient::with_url("k", server.uri()));
        let mut session = ChatSession::new(client);

        let mut updates = Vec::new();
        let text = session
            .send("hi", |partial| updates.push(partial.to_string()))
            .await
            .unwrap();

        assert_eq!(text, "Hello");
        assert_eq!(updates, vec!["He", "Hello"]);
        assert_eq!(
            session.history(),
            &[ChatMessage::user("hi"), ChatMessage::assistant("Hello")]
        );
    }

    #[tokio::test]
    async fn test_page_prefix() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::body_partial_json(serde_json::json!({
                "messages": [
                    {"role": "system", "content": "Be brief"},
                    {"role": "user", "content": "Webpage content: <h1>News</h1>\nsummarize"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(STREAM_BODY))
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(XAiClient::with_url("k", server.uri()));
        let mut session = ChatSession::new(client).with_system_prompt("Be brief");
        session.attach_page("<h1>News</h1>");
        assert!(session.has_page());

        session.send("summarize", |_| {}).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let client = Arc::new(XAiClient::with_url("k", "http://127.0.0.1:1"));
        let mut session = ChatSession::new(client);
        let result = session.send("   ", |_| {}).await;
        assert!(matches!(result, Err(ProviderError::InvalidRequest(_))));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_buffered_turn() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::body_partial_json(serde_json::json!({"stream": false})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Sure."}}]
            })))
            .mount(&server)
            .await;

        let client = Arc::new(XAiClient::with_url("k", server.uri()));
        let mut session = ChatSession::new(client);
        assert_eq!(session.send_buffered("ok?").await.unwrap(), "Sure.");
        assert_eq!(session.history().len(), 2);
    }

    #[tokio::test]
    async fn test_http_error_keeps_user_turn() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = Arc::new(XAiClient::with_url("k", server.uri()));
        let mut session = ChatSession::new(client);
        let err = session.send("hi", |_| {}).await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert_eq!(session.history(), &[ChatMessage::user("hi")]);
    }
}
