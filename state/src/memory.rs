//! In-memory backing store for tests and ephemeral runs

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tasknest_core::{KeyValueStore, StoreResult};

/// In-memory key-value store
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    data: DashMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        for (key, value) in entries {
            store.data.insert(key.into(), value.into());
        }
        store
    }

    /// Synchronous peek, for assertions
    pub fn value(&self, key: &str) -> Option<String> {
        self.data.get(key).map(|v| v.value().clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.data.remove(key);
        Ok(())
    }
}

/// Thread-safe memory store wrapper
pub type SharedMemoryKeyValueStore = Arc<MemoryKeyValueStore>;

/// Create a shared memory backing store
pub fn create_memory_store() -> SharedMemoryKeyValueStore {
    Arc::new(MemoryKeyValueStore::new())
}
