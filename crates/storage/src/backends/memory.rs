//! In-memory storage backend

use crate::{Result, Storage};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Keeps values in a process-local map
///
/// Nothing survives the process; useful in tests and for sessions that should
/// not touch disk.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStorage::new();
        assert!(store.is_empty());
        assert_eq!(store.get_item("prefs").await.unwrap(), None);

        store.set_item("prefs", "{}".to_string()).await.unwrap();
        assert_eq!(store.get_item("prefs").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(store.len(), 1);

        store.remove_item("prefs").await.unwrap();
        assert_eq!(store.get_item("prefs").await.unwrap(), None);
        // Removing an absent key is not an error
        store.remove_item("prefs").await.unwrap();
    }
}
