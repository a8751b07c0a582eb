//! General application state.

use serde::{Deserialize, Serialize};

use lightpilot_protocols::StoreKey;

use super::Reducer;

/// Top-level navigation tab of the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Wallet,
    Settings,
    #[serde(rename = "grokchat")]
    GrokChat,
    Agent,
}

/// Screen shown inside the active tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    #[default]
    Home,
    Send,
    Receive,
    #[serde(rename = "grokchat")]
    GrokChat,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppState {
    pub active_tab: Tab,
    pub current_screen: Screen,
    pub is_logged_in: bool,
    pub user: Option<User>,
    #[serde(rename = "xAiApiKey")]
    pub xai_api_key: Option<String>,
    pub x_api_key: Option<String>,
    pub webpage_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    SetActiveTab(Tab),
    SetCurrentScreen(Screen),
    SetLoggedIn(bool),
    SetUser(Option<User>),
    SetXAiApiKey(Option<String>),
    SetXApiKey(Option<String>),
    /// Applied out-of-band from `UPDATE_WEBPAGE_CONTENT` broadcasts.
    SetWebpageContent(String),
}

pub struct AppReducer;

impl Reducer for AppReducer {
    type State = AppState;
    type Action = AppAction;

    const STORE_KEY: StoreKey = StoreKey::AppState;

    fn reduce(state: &AppState, action: AppAction) -> AppState {
        let mut next = state.clone();
        match action {
            AppAction::SetActiveTab(tab) => next.active_tab = tab,
            AppAction::SetCurrentScreen(screen) => next.current_screen = screen,
            AppAction::SetLoggedIn(logged_in) => next.is_logged_in = logged_in,
            AppAction::SetUser(user) => next.user = user,
            AppAction::SetXAiApiKey(key) => next.xai_api_key = key,
            AppAction::SetXApiKey(key) => next.x_api_key = key,
            AppAction::SetWebpageContent(content) => next.webpage_content = Some(content),
        }
        next
    }
}
