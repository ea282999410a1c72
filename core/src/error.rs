//! Error types for Tasknest

use thiserror::Error;

/// Main error type for Tasknest
#[derive(Error, Debug)]
pub enum StoreError {
    // ============ Caller Errors ============
    #[error("Validation failed: {0}")]
    Validation(String),

    // ============ Persistence Errors ============
    #[error("Corrupted value for key '{key}': {reason}")]
    Corruption { key: String, reason: String },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    // ============ Configuration Errors ============
    #[error("Configuration error: {0}")]
    Config(String),

    // ============ General Errors ============
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Build a corruption error for a persisted key
    pub fn corruption(key: impl Into<String>, reason: impl ToString) -> Self {
        StoreError::Corruption {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, StoreError::Corruption { .. })
    }

    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, StoreError::StorageUnavailable(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
