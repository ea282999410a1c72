//! Durable backing store using sled database

use async_trait::async_trait;
use sled::{Db, Tree};
use std::path::Path;
use std::sync::Arc;
use tasknest_core::{KeyValueStore, StoreError, StoreResult};

const KV_TREE: &str = "kv";

fn storage_error(e: sled::Error) -> StoreError {
    StoreError::StorageUnavailable(e.to_string())
}

/// Persistent key-value store backed by sled database
pub struct SledKeyValueStore {
    db: Db,
    kv: Tree,
}

impl SledKeyValueStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path).map_err(storage_error)?;
        let kv = db.open_tree(KV_TREE).map_err(storage_error)?;
        Ok(Self { db, kv })
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.kv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kv.is_empty()
    }

    /// Blocks until the write is on disk. Nothing of the database stays
    /// borrowed once this returns, so the path can be reopened right away.
    fn flush(&self) -> StoreResult<()> {
        self.db.flush().map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SledKeyValueStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.kv.get(key).map_err(storage_error)? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| StoreError::corruption(key, e)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.kv
            .insert(key, value.as_bytes())
            .map_err(storage_error)?;
        self.flush()
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.kv.remove(key).map_err(storage_error)?;
        self.flush()
    }
}

/// Thread-safe persistent store wrapper
pub type SharedSledKeyValueStore = Arc<SledKeyValueStore>;

/// Create a shared persistent backing store
pub fn create_persistent_store<P: AsRef<Path>>(path: P) -> StoreResult<SharedSledKeyValueStore> {
    Ok(Arc::new(SledKeyValueStore::open(path)?))
}
