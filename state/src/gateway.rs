//! Write-through persistence
//!
//! The gateway subscribes to a [`StateContainer`] and, after every
//! transition, encodes each whitelisted slice that changed since its last
//! write and hands the write to the async runtime. `dispatch` never waits on
//! storage and never sees a storage error: failures go to the error sink.
//!
//! Writes to the same key are not serialized. Each one carries the full
//! slice, so a late completion can only leave an older complete snapshot
//! behind, never a torn value.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tasknest_core::{ErrorSink, KeyValueStore, PersistentState, StoreError, StoreResult};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::debug;

use crate::container::{StateContainer, Subscription, Transition};

/// Map configured slice names to slices of `S`
pub fn resolve_whitelist<S: PersistentState>(names: &[String]) -> StoreResult<Vec<S::Slice>> {
    let mut slices = Vec::with_capacity(names.len());
    for name in names {
        let slice = S::slice_from_key(name)
            .ok_or_else(|| StoreError::Config(format!("unknown slice '{}' in whitelist", name)))?;
        if !slices.contains(&slice) {
            slices.push(slice);
        }
    }
    Ok(slices)
}

/// Mirrors whitelisted slices into a backing store
pub struct PersistenceGateway<S: PersistentState> {
    backend: Arc<dyn KeyValueStore>,
    whitelist: Vec<S::Slice>,
    sink: Arc<dyn ErrorSink>,
    write_timeout: Option<Duration>,
    runtime: Handle,
    /// State at the last scheduled write of each slice. Holding the `Arc`
    /// keeps the slice allocation alive, so identity checks cannot alias.
    last_written: Mutex<HashMap<S::Slice, Arc<S>>>,
    pending: Arc<PendingWrites>,
}

/// In-flight write counter shared with the spawned write tasks
#[derive(Default)]
struct PendingWrites {
    count: AtomicUsize,
    idle: Notify,
}

impl PendingWrites {
    fn begin(self: &Arc<Self>) -> PendingWrite {
        self.count.fetch_add(1, Ordering::AcqRel);
        PendingWrite(Arc::clone(self))
    }
}

/// Marks one write as in flight until dropped, including on panic
struct PendingWrite(Arc<PendingWrites>);

impl Drop for PendingWrite {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl<S: PersistentState> PersistenceGateway<S> {
    /// Must be called from within a tokio runtime
    pub fn new(
        backend: Arc<dyn KeyValueStore>,
        whitelist: Vec<S::Slice>,
        sink: Arc<dyn ErrorSink>,
    ) -> StoreResult<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            StoreError::Internal(format!("persistence gateway needs a tokio runtime: {}", e))
        })?;

        Ok(Self {
            backend,
            whitelist,
            sink,
            write_timeout: None,
            runtime,
            last_written: Mutex::new(HashMap::new()),
            pending: Arc::new(PendingWrites::default()),
        })
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    pub fn whitelist(&self) -> &[S::Slice] {
        &self.whitelist
    }

    /// Start mirroring `container`.
    ///
    /// The current state counts as already written: attaching right after
    /// rehydration does not echo the loaded values back to storage.
    pub fn attach(self: &Arc<Self>, container: &StateContainer<S>) -> Subscription {
        let state = container.get_state();
        {
            let mut last = self.last_written.lock();
            for slice in &self.whitelist {
                last.insert(*slice, state.clone());
            }
        }

        let gateway = Arc::clone(self);
        container.subscribe(move |transition| gateway.on_transition(transition))
    }

    /// Number of writes scheduled but not yet completed
    pub fn pending_writes(&self) -> usize {
        self.pending.count.load(Ordering::Acquire)
    }

    /// Wait until every scheduled write has completed
    pub async fn flush(&self) {
        loop {
            let idle = self.pending.idle.notified();
            if self.pending.count.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }

    fn on_transition(&self, transition: &Transition<'_, S>) {
        let current = transition.current;

        for slice in &self.whitelist {
            {
                let mut last = self.last_written.lock();
                let changed = match last.get(slice) {
                    Some(previous) => current.slice_changed(previous, *slice),
                    None => true,
                };
                if !changed {
                    continue;
                }
                last.insert(*slice, current.clone());
            }

            let key = S::slice_key(*slice);
            match current.encode_slice(*slice) {
                Ok(value) => self.schedule_write(key, value, transition.version),
                Err(e) => self.sink.report(key, &e),
            }
        }
    }

    fn schedule_write(&self, key: &'static str, value: String, version: u64) {
        debug!(key, version, bytes = value.len(), "scheduling slice write");

        let pending = self.pending.begin();
        let backend = Arc::clone(&self.backend);
        let sink = Arc::clone(&self.sink);
        let timeout = self.write_timeout;
        self.runtime.spawn(async move {
            // Declared first, dropped last
            let _pending = pending;
            let result = write(backend.as_ref(), key, &value, timeout).await;
            // Release the backend before the write counts as done
            drop(backend);
            if let Err(e) = result {
                sink.report(key, &e);
            }
        });
    }
}

async fn write(
    backend: &dyn KeyValueStore,
    key: &str,
    value: &str,
    timeout: Option<Duration>,
) -> StoreResult<()> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, backend.set(key, value))
            .await
            .map_err(|_| {
                StoreError::StorageUnavailable(format!(
                    "write of '{}' timed out after {:?}",
                    key, timeout
                ))
            })?,
        None => backend.set(key, value).await,
    }
}
