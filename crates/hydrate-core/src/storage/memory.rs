//! In-process key-value store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::KeyValueStore;
use crate::error::PortError;

/// `KeyValueStore` backed by a `HashMap`. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PortError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PortError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), PortError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn update(
        &self,
        key: &str,
        apply: &mut (dyn FnMut(Option<String>) -> Result<Option<String>, PortError> + Send),
    ) -> Result<(), PortError> {
        let mut entries = self.entries.lock();
        match apply(entries.get(key).cloned())? {
            Some(value) => {
                entries.insert(key.to_string(), value);
            }
            None => {
                entries.remove(key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get("k").await.unwrap().is_none());

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.len(), 1);

        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn failed_update_leaves_value() {
        let store = MemoryStore::new();
        store.set("k", "v").await.unwrap();

        let err = store
            .update("k", &mut |_| Err(PortError::WriteFailed {
                key: "k".into(),
                message: "full".into(),
            }))
            .await;
        assert!(err.is_err());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        store.update("k", &mut |_| Ok(None)).await.unwrap();
        assert!(store.is_empty());
    }
}
