//! Backing store doubles shared by the crate's tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tasknest_core::{KeyValueStore, StoreError, StoreResult};

use crate::memory::MemoryKeyValueStore;

/// Wraps a memory store and fails, stalls or panics on demand
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryKeyValueStore,
    reads_fail: AtomicBool,
    writes_fail: AtomicBool,
    writes_panic: AtomicBool,
    read_delay: Mutex<Option<Duration>>,
    write_delay: Mutex<Option<Duration>>,
}

impl FlakyStore {
    pub fn new(inner: MemoryKeyValueStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.reads_fail.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.writes_fail.store(fail, Ordering::SeqCst);
    }

    pub fn panic_on_write(&self, panic: bool) {
        self.writes_panic.store(panic, Ordering::SeqCst);
    }

    pub fn delay_reads(&self, delay: Duration) {
        *self.read_delay.lock() = Some(delay);
    }

    pub fn delay_writes(&self, delay: Duration) {
        *self.write_delay.lock() = Some(delay);
    }

    async fn before_write(&self, op: &str, key: &str) -> StoreResult<()> {
        let delay = *self.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.writes_panic.load(Ordering::SeqCst) {
            panic!("backing store crashed during {} of {}", op, key);
        }
        if self.writes_fail.load(Ordering::SeqCst) {
            return Err(StoreError::StorageUnavailable(format!("{} of {} refused", op, key)));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let delay = *self.read_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(StoreError::StorageUnavailable(format!("read of {} refused", key)));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.before_write("write", key).await?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.before_write("remove", key).await?;
        self.inner.remove(key).await
    }
}
