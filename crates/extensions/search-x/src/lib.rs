//! Recent post search against the X API v2.

use serde::{Deserialize, Serialize};
use tracing::debug;

use lightpilot_protocols::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com/2";
pub const DEFAULT_MAX_RESULTS: u32 = 10;

const SEARCH_RECENT_PATH: &str = "/tweets/search/recent";
const TWEET_FIELDS: &str = "author_id,created_at,text";
const EXPANSIONS: &str = "author_id";
const USER_FIELDS: &str = "name,username,profile_image_url";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<Author>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub data: Vec<Post>,
    #[serde(default)]
    pub includes: Includes,
    #[serde(default)]
    pub meta: serde_json::Value,
}

impl SearchResponse {
    /// Expanded author of `post`, if included in the response.
    pub fn author_of(&self, post: &Post) -> Option<&Author> {
        let id = post.author_id.as_deref()?;
        self.includes.users.iter().find(|u| u.id == id)
    }
}

/// Bearer-authenticated search client.
pub struct XApiClient {
    bearer_token: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl XApiClient {
    pub fn new(bearer_token: Option<String>) -> Self {
        Self::with_url(bearer_token, DEFAULT_BASE_URL)
    }

    pub fn with_url(bearer_token: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            bearer_token,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn set_bearer_token(&mut self, bearer_token: Option<String>) {
        self.bearer_token = bearer_token;
    }

    /// Search posts from the last seven days.
    pub async fn search_recent(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<SearchResponse, ProviderError> {
        let token = self
            .bearer_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::MissingCredentials("Bearer token is not set".to_string()))?;

        let url = format!("{}{}", self.base_url, SEARCH_RECENT_PATH);
        let max_results = max_results.to_string();
        debug!("GET {} query={:?}", url, query);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[
                ("query", query),
                ("max_results", max_results.as_str()),
                ("tweet.fields", TWEET_FIELDS),
                ("expansions", EXPANSIONS),
                ("user.fields", USER_FIELDS),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http { status, message });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}
