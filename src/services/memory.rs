//! In-process storage, for tests and single-process embedding.

use super::StorageService;
use crate::error::ServiceError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// A `HashMap` behind a lock. Cheap to clone the contents out for assertions.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = match self.entries.read() {
            Ok(map) => map.keys().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().keys().cloned().collect(),
        };
        keys.sort();
        keys
    }
}

#[async_trait]
impl StorageService for InMemoryStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ServiceError> {
        let mut map = self
            .entries
            .write()
            .map_err(|_| ServiceError::Permanent("storage lock poisoned".into()))?;
        map.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        let map = self
            .entries
            .read()
            .map_err(|_| ServiceError::Permanent("storage lock poisoned".into()))?;
        Ok(map.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = InMemoryStorage::new();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn last_write_wins() {
        let store = InMemoryStorage::new();
        store.put("k", b"one".to_vec()).await.unwrap();
        store.put("k", b"two".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.keys(), vec!["k".to_string()]);
    }
}
