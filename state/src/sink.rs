//! Error sinks for contained persistence failures

use parking_lot::Mutex;
use tasknest_core::{ErrorSink, StoreError};
use tracing::error;

/// Reports through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, key: &str, err: &StoreError) {
        error!(key, error = %err, "persistence failure");
    }
}

/// A reported failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    pub key: String,
    pub message: String,
    pub corruption: bool,
    pub storage_unavailable: bool,
}

/// Keeps every report in memory; also forwards to `tracing`
#[derive(Debug, Default)]
pub struct MemoryErrorSink {
    reports: Mutex<Vec<ReportedError>>,
}

impl MemoryErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ReportedError> {
        self.reports.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl ErrorSink for MemoryErrorSink {
    fn report(&self, key: &str, err: &StoreError) {
        TracingErrorSink.report(key, err);
        self.reports.lock().push(ReportedError {
            key: key.to_string(),
            message: err.to_string(),
            corruption: err.is_corruption(),
            storage_unavailable: err.is_storage_unavailable(),
        });
    }
}
