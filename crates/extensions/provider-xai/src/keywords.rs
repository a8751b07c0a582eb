//! Keyword extraction from captured page content.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use lightpilot_protocols::{ChatMessage, ProviderError};

use crate::api::CompletionOptions;
use crate::client::XAiClient;

pub const KEYWORD_SYSTEM_PROMPT: &str = "Analyze the following webpage content and extract 5-10 key phrases or keywords that best represent the main topics and themes of the page. Return these as a JSON array of objects, each with a \"text\" property. Do not wrap the JSON in a code block.";

/// Characters of page content sent for analysis.
pub const MAX_PAGE_CHARS: usize = 8000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
    #[serde(default, rename = "isIncluded")]
    pub included: bool,
}

impl Keyword {
    pub fn toggle(&mut self) {
        self.included = !self.included;
    }
}

/// Ask the model for keywords describing `page_content`.
pub async fn extract_keywords(
    client: &XAiClient,
    page_content: &str,
) -> Result<Vec<Keyword>, ProviderError> {
    let truncated: String = page_content.chars().take(MAX_PAGE_CHARS).collect();
    let messages = [
        ChatMessage::system(KEYWORD_SYSTEM_PROMPT),
        ChatMessage::user(truncated),
    ];

    let completion = client.complete(&messages, &CompletionOptions::default()).await?;
    let content = completion
        .content()
        .ok_or_else(|| ProviderError::InvalidResponse("no message content".to_string()))?;

    let keywords = parse_keywords(content)?;
    debug!("Extracted {} keyword(s)", keywords.len());
    Ok(keywords)
}

fn array_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[\s\S]*\]").expect("array regex"))
}

/// Parse the first `[...]` span of a model reply. A reply without one
/// yields no keywords.
pub fn parse_keywords(reply: &str) -> Result<Vec<Keyword>, ProviderError> {
    let Some(span) = array_regex().find(reply) else {
        warn!("Keyword reply contained no JSON array");
        return Ok(Vec::new());
    };

    let mut keywords: Vec<Keyword> = serde_json::from_str(span.as_str())
        .map_err(|e| ProviderError::InvalidResponse(format!("keyword list: {}", e)))?;
    for keyword in &mut keywords {
        keyword.included = false;
    }
    Ok(keywords)
}

/// Search query from the included keywords, or `fallback` when there are no
/// keywords at all.
pub fn compose_query(keywords: &[Keyword], fallback: &str) -> String {
    if keywords.is_empty() {
        return fallback.to_string();
    }
    keywords
        .iter()
        .filter(|k| k.included)
        .map(|k| k.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    #[test]
    fn test_parse_with_surrounding_prose() {
        let reply = "Here you go:\n[{\"text\": \"rust\"}, {\"text\": \"async io\"}]\nEnjoy.";
        let keywords = parse_keywords(reply).unwrap();
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[1].text, "async io");
        assert!(keywords.iter().all(|k| !k.included));
    }

    #[test]
    fn test_parse_resets_included_flag() {
        let keywords = parse_keywords("[{\"text\": \"a\", \"isIncluded\": true}]").unwrap();
        assert!(!keywords[0].included);
    }

    #[test]
    fn test_array_pattern_compiled_once() {
        assert!(std::ptr::eq(array_regex(), array_regex()));
        assert_eq!(parse_keywords("[]").unwrap(), Vec::<Keyword>::new());
    }

    #[test]
    fn test_parse_without_array() {
        assert!(parse_keywords("no keywords found").unwrap().is_empty());
    }

    #[test]
    fn test_parse_invalid_array() {
        assert!(matches!(
            parse_keywords("[not json]"),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_compose_query() {
        let mut keywords = vec![
            Keyword { text: "lightning".to_string(), included: false },
            Keyword { text: "wallet".to_string(), included: false },
            Keyword { text: "fees".to_string(), included: false },
        ];
        keywords[0].toggle();
        keywords[2].toggle();
        assert_eq!(compose_query(&keywords, "ignored"), "lightning fees");
        assert_eq!(compose_query(&[], "typed query"), "typed query");
    }

    #[tokio::test]
    async fn test_extract_truncates_page() {
        let server = MockServer::start().await;
        let page = "x".repeat(MAX_PAGE_CHARS + 500);
        let expected_user = "x".repeat(MAX_PAGE_CHARS);

        Mock::given(matchers::method("POST"))
            .and(matchers::body_partial_json(serde_json::json!({
                "stream": false,
                "messages": [
                    {"role": "system", "content": KEYWORD_SYSTEM_PROMPT},
                    {"role": "user", "content": expected_user}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "[{\"text\": \"x\"}]"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = XAiClient::with_url("k", server.uri());
        let keywords = extract_keywords(&client, &page).await.unwrap();
        assert_eq!(keywords, vec![Keyword { text: "x".to_string(), included: false }]);
    }
}
