//! Chat-completion client.

use tracing::debug;

use lightpilot_protocols::{ChatMessage, ChatRole, ProviderError};

use crate::api::{ApiRequest, ChatCompletion, CompletionOptions};
use crate::stream::DeltaStream;

pub const DEFAULT_API_URL: &str = "https://api.x.ai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "grok-preview";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Client for an OpenAI-compatible chat-completion endpoint.
pub struct XAiClient {
    api_key: String,
    api_url: String,
    default_model: String,
    default_temperature: f32,
    client: reqwest::Client,
}

impl XAiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_url(api_key, DEFAULT_API_URL)
    }

    /// Create a client against a custom endpoint.
    pub fn with_url(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: api_url.into(),
            default_model: DEFAULT_MODEL.to_string(),
            default_temperature: DEFAULT_TEMPERATURE,
            client: reqwest::Client::new(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn default_temperature(&self) -> f32 {
        self.default_temperature
    }

    pub fn set_default_model(&mut self, model: impl Into<String>) {
        self.default_model = model.into();
    }

    pub fn set_default_temperature(&mut self, temperature: f32) {
        self.default_temperature = temperature;
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        options: &'a CompletionOptions,
        stream: bool,
    ) -> ApiRequest<'a> {
        ApiRequest {
            model: options.model.as_deref().unwrap_or(&self.default_model),
            messages,
            temperature: options.temperature.unwrap_or(self.default_temperature),
            stream,
        }
    }

    async fn send_request(&self, request: &ApiRequest<'_>) -> Result<reqwest::Response, ProviderError> {
        debug!(
            "POST {} model={} messages={} stream={}",
            self.api_url,
            request.model,
            request.messages.len(),
            request.stream
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http { status, message });
        }

        Ok(response)
    }

    /// Buffered completion.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<ChatCompletion, ProviderError> {
        let request = self.build_request(messages, options, false);
        let response = self.send_request(&request).await?;

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        let mut completion: ChatCompletion = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        completion.raw = raw;
        Ok(completion)
    }

    /// Streamed completion. HTTP failures surface here, before any delta.
    pub async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<DeltaStream, ProviderError> {
        let request = self.build_request(messages, options, true);
        let response = self.send_request(&request).await?;
        Ok(DeltaStream::from_response(response))
    }

    pub async fn complete_with_system_prompt(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<ChatCompletion, ProviderError> {
        let messages = ensure_system_prompt(messages, system_prompt);
        self.complete(&messages, options).await
    }

    pub async fn complete_stream_with_system_prompt(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<DeltaStream, ProviderError> {
        let messages = ensure_system_prompt(messages, system_prompt);
        self.complete_stream(&messages, options).await
    }
}

/// Prepend a system message unless the list already starts with one.
pub fn ensure_system_prompt(messages: &[ChatMessage], system_prompt: &str) -> Vec<ChatMessage> {
    match messages.first() {
        Some(first) if first.role == ChatRole::System => messages.to_vec(),
        _ => {
            let mut out = Vec::with_capacity(messages.len() + 1);
            out.push(ChatMessage::system(system_prompt));
            out.extend_from_slice(messages);
            out
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
