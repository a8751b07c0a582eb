//! Persistent state store shared by every context.

use std::fmt;

use async_trait::async_trait;

use crate::error::StoreError;

/// Logical domains held in the state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    AppState,
    XAiState,
    XState,
    WebpageContent,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::AppState => "appState",
            StoreKey::XAiState => "xAiState",
            StoreKey::XState => "xState",
            StoreKey::WebpageContent => "webpageContent",
        }
    }

    pub fn all() -> [StoreKey; 4] {
        [
            StoreKey::AppState,
            StoreKey::XAiState,
            StoreKey::XState,
            StoreKey::WebpageContent,
        ]
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable asynchronous key-value store.
///
/// Writes replace the whole record (last writer wins). There is no
/// versioning, so concurrent writers to one key from different contexts can
/// lose updates.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the record stored under `key`.
    async fn get(&self, key: StoreKey) -> Result<Option<serde_json::Value>, StoreError>;

    /// Replace the record stored under `key`.
    async fn set(&self, key: StoreKey, value: serde_json::Value) -> Result<(), StoreError>;

    /// Remove the record stored under `key`. Missing keys are not an error.
    async fn remove(&self, key: StoreKey) -> Result<(), StoreError>;

    /// Keys that currently hold a record.
    async fn keys(&self) -> Result<Vec<StoreKey>, StoreError>;
}
