//! State store backends.
//!
//! Both backends replace whole records on write. Two contexts writing the
//! same key race, and the last write wins.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use lightpilot_protocols::{StateStore, StoreError, StoreKey};

/// In-memory state store.
#[derive(Default)]
pub struct MemoryStateStore {
    records: RwLock<HashMap<StoreKey, Value>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, key: StoreKey) -> Result<Option<Value>, StoreError> {
        Ok(self.records.read().await.get(&key).cloned())
    }

    async fn set(&self, key: StoreKey, value: Value) -> Result<(), StoreError> {
        self.records.write().await.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        self.records.write().await.remove(&key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<StoreKey>, StoreError> {
        let records = self.records.read().await;
        Ok(StoreKey::all()
            .into_iter()
            .filter(|k| records.contains_key(k))
            .collect())
    }
}

/// File-backed state store: one JSON document per key.
pub struct FileStateStore {
    directory: PathBuf,
}

impl FileStateStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &PathBuf {
        &self.directory
    }

    pub(crate) fn record_path(&self, key: StoreKey) -> PathBuf {
        self.directory.join(format!("{}.json", key.as_str()))
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self, key: StoreKey) -> Result<Option<Value>, StoreError> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let json = tokio::fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    async fn set(&self, key: StoreKey, value: Value) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let json = serde_json::to_string_pretty(&value)?;
        let path = self.record_path(key);
        tokio::fs::write(&path, json).await?;
        debug!("Saved {} to {:?}", key, path);
        Ok(())
    }

    async fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        let path = self.record_path(key);
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
            debug!("Removed {:?}", path);
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<StoreKey>, StoreError> {
        Ok(StoreKey::all()
            .into_iter()
            .filter(|k| self.record_path(*k).exists())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_set_get_remove() {
        let store = MemoryStateStore::new();
        assert!(store.get(StoreKey::AppState).await.unwrap().is_none());

        store
            .set(StoreKey::AppState, json!({"activeTab": "wallet"}))
            .await
            .unwrap();
        assert_eq!(
            store.get(StoreKey::AppState).await.unwrap(),
            Some(json!({"activeTab": "wallet"}))
        );
        assert_eq!(store.keys().await.unwrap(), vec![StoreKey::AppState]);

        store.remove(StoreKey::AppState).await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_last_writer_wins() {
        let store = MemoryStateStore::new();
        store.set(StoreKey::XAiState, json!({"apiKey": "a"})).await.unwrap();
        store.set(StoreKey::XAiState, json!({"apiKey": "b"})).await.unwrap();
        assert_eq!(
            store.get(StoreKey::XAiState).await.unwrap(),
            Some(json!({"apiKey": "b"}))
        );
    }

    #[tokio::test]
    async fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path().join("state"));

        store
            .set(StoreKey::WebpageContent, json!("<html>hi</html>"))
            .await
            .unwrap();
        assert!(store.record_path(StoreKey::WebpageContent).ends_with("webpageContent.json"));

        let reopened = FileStateStore::new(dir.path().join("state"));
        assert_eq!(
            reopened.get(StoreKey::WebpageContent).await.unwrap(),
            Some(json!("<html>hi</html>"))
        );
        assert_eq!(reopened.keys().await.unwrap(), vec![StoreKey::WebpageContent]);
    }

    #[tokio::test]
    async fn test_file_missing_directory() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path().join("absent"));
        assert!(store.get(StoreKey::XState).await.unwrap().is_none());
        assert!(store.keys().await.unwrap().is_empty());
        store.remove(StoreKey::XState).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_corrupt_record() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path());
        std::fs::write(store.record_path(StoreKey::AppState), "{not json").unwrap();

        let result = store.get(StoreKey::AppState).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }
}
