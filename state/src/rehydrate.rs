//! Startup rehydration
//!
//! Reads every whitelisted slice from the backing store and seeds the
//! container through the slice's restore action. Missing keys keep the
//! compiled-in default; unreadable or corrupt values are reported and also
//! fall back to the default. Rehydration never fails startup.

use std::sync::Arc;
use std::time::Duration;
use tasknest_core::{ErrorSink, KeyValueStore, PersistentState, StoreError, StoreResult};
use tracing::{debug, info};

use crate::container::StateContainer;

/// What happened to one slice during rehydration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceOutcome {
    /// Decoded and dispatched
    Restored,
    /// Key absent; default kept
    Missing,
    /// Value present but undecodable; default kept
    Corrupted,
    /// Backing store read failed; default kept
    Unavailable,
}

/// Per-slice outcome of a rehydration run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RehydrationReport {
    pub outcomes: Vec<(&'static str, SliceOutcome)>,
}

impl RehydrationReport {
    pub fn outcome(&self, key: &str) -> Option<SliceOutcome> {
        self.outcomes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, outcome)| *outcome)
    }

    pub fn count(&self, outcome: SliceOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }

    /// No slice fell back to its default because of a failure
    pub fn is_clean(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, o)| matches!(o, SliceOutcome::Restored | SliceOutcome::Missing))
    }
}

/// Loads persisted slices into a container
pub struct Rehydrator<S: PersistentState> {
    backend: Arc<dyn KeyValueStore>,
    whitelist: Vec<S::Slice>,
    sink: Arc<dyn ErrorSink>,
    read_timeout: Option<Duration>,
}

impl<S: PersistentState> Rehydrator<S> {
    pub fn new(
        backend: Arc<dyn KeyValueStore>,
        whitelist: Vec<S::Slice>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            backend,
            whitelist,
            sink,
            read_timeout: None,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Seed `container` from the backing store. Await this before anything
    /// renders from the container.
    pub async fn rehydrate(&self, container: &StateContainer<S>) -> RehydrationReport {
        let mut report = RehydrationReport::default();

        for slice in &self.whitelist {
            let key = S::slice_key(*slice);
            let outcome = match self.read(key).await {
                Ok(None) => {
                    debug!(key, "no persisted value, keeping default");
                    SliceOutcome::Missing
                }
                Ok(Some(raw)) => match S::restore_action(*slice, &raw) {
                    Ok(action) => {
                        container.dispatch(action);
                        debug!(key, "slice restored");
                        SliceOutcome::Restored
                    }
                    Err(e) => {
                        self.sink.report(key, &e);
                        debug!(key, "persisted value is corrupt, using default");
                        SliceOutcome::Corrupted
                    }
                },
                Err(e) => {
                    self.sink.report(key, &e);
                    debug!(key, "backing store read failed, using default");
                    if e.is_corruption() {
                        SliceOutcome::Corrupted
                    } else {
                        SliceOutcome::Unavailable
                    }
                }
            };
            report.outcomes.push((key, outcome));
        }

        info!(
            restored = report.count(SliceOutcome::Restored),
            missing = report.count(SliceOutcome::Missing),
            corrupted = report.count(SliceOutcome::Corrupted),
            unavailable = report.count(SliceOutcome::Unavailable),
            "rehydration complete"
        );

        report
    }

    async fn read(&self, key: &str) -> StoreResult<Option<String>> {
        match self.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.backend.get(key))
                .await
                .map_err(|_| {
                    StoreError::StorageUnavailable(format!(
                        "read of '{}' timed out after {:?}",
                        key, timeout
                    ))
                })?,
            None => self.backend.get(key).await,
        }
    }
}
