//! Stored API credentials for the completion and social-search services.

use serde::{Deserialize, Serialize};

use lightpilot_protocols::StoreKey;

use super::Reducer;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct XAiState {
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XAiAction {
    SetApiKey(Option<String>),
}

pub struct XAiReducer;

impl Reducer for XAiReducer {
    type State = XAiState;
    type Action = XAiAction;

    const STORE_KEY: StoreKey = StoreKey::XAiState;

    fn reduce(_state: &XAiState, action: XAiAction) -> XAiState {
        match action {
            XAiAction::SetApiKey(api_key) => XAiState { api_key },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct XApiCredentials {
    pub api_key: String,
    pub api_key_secret: String,
    pub bearer_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct XState {
    pub api_credentials: Option<XApiCredentials>,
}

impl XState {
    /// Bearer token, if one is stored and non-empty.
    pub fn bearer_token(&self) -> Option<&str> {
        self.api_credentials
            .as_ref()
            .map(|c| c.bearer_token.as_str())
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XAction {
    SetCredentials(Option<XApiCredentials>),
}

pub struct XReducer;

impl Reducer for XReducer {
    type State = XState;
    type Action = XAction;

    const STORE_KEY: StoreKey = StoreKey::XState;

    fn reduce(_state: &XState, action: XAction) -> XState {
        match action {
            XAction::SetCredentials(api_credentials) => XState { api_credentials },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_api_key() {
        let next = XAiReducer::reduce(
            &XAiState::default(),
            XAiAction::SetApiKey(Some("xai-1".to_string())),
        );
        assert_eq!(next.api_key.as_deref(), Some("xai-1"));
    }

    #[test]
    fn test_x_bearer_token() {
        let state = XReducer::reduce(
            &XState::default(),
            XAction::SetCredentials(Some(XApiCredentials {
                bearer_token: "AAAA".to_string(),
                ..Default::default()
            })),
        );
        assert_eq!(state.bearer_token(), Some("AAAA"));
        assert_eq!(XState::default().bearer_token(), None);
    }

    #[test]
    fn test_empty_bearer_token_is_absent() {
        let state = XState {
            api_credentials: Some(XApiCredentials::default()),
        };
        assert_eq!(state.bearer_token(), None);
    }

    #[tokio::test]
    async fn test_stored_key_restored_by_hydration() {
        use crate::projection::Projection;
        use crate::store::MemoryStateStore;
        use lightpilot_protocols::StateStore;

        let store = MemoryStateStore::new();
        store
            .set(StoreKey::XAiState, serde_json::json!({"apiKey": "xai-9"}))
            .await
            .unwrap();

        let projection = Projection::<XAiReducer>::new();
        assert!(projection.hydrate(&store).await.unwrap());
        assert_eq!(projection.state().api_key.as_deref(), Some("xai-9"));
    }

    #[test]
    fn test_credentials_wire_shape() {
        let state = XState {
            api_credentials: Some(XApiCredentials {
                api_key: "k".to_string(),
                api_key_secret: "s".to_string(),
                bearer_token: "t".to_string(),
            }),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["apiCredentials"]["apiKeySecret"], "s");
        assert_eq!(json["apiCredentials"]["bearerToken"], "t");
    }
}
