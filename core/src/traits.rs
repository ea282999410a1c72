//! Core traits defining Tasknest interfaces
//!
//! These traits are the seams between the in-memory state container and
//! everything outside it: durable storage, serialization and error
//! reporting.

use crate::error::StoreError;
use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Result type for Tasknest operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable string key-value store.
///
/// Only single-key writes are atomic. Implementations report every failure
/// as [`StoreError::StorageUnavailable`].
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key, `None` when the key was never written
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Set a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove a key
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Converts a slice value to and from its persisted text form.
///
/// `decode(encode(v))` must equal `v` for every reachable value.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> StoreResult<String>;

    /// Fails with [`StoreError::Corruption`] on malformed input
    fn decode(&self, raw: &str) -> StoreResult<T>;
}

/// Destination for failures that must not reach the caller of `dispatch`
pub trait ErrorSink: Send + Sync {
    fn report(&self, key: &str, error: &StoreError);
}

/// A state tree with a pure reducer
pub trait Reducer: Default + Send + Sync + 'static {
    /// Closed set of mutations accepted by this state
    type Action: Debug + Send + Sync + 'static;

    /// Compute the next state. Must be total: never fails for any action.
    fn reduce(&self, action: &Self::Action) -> Self;
}

/// A state tree split into independently persisted slices
pub trait PersistentState: Reducer {
    /// Slice identifier
    type Slice: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Every slice of the tree, in rehydration order
    fn slices() -> &'static [Self::Slice];

    /// Fixed backing-store key of a slice
    fn slice_key(slice: Self::Slice) -> &'static str;

    /// Look up a slice by its key
    fn slice_from_key(key: &str) -> Option<Self::Slice> {
        Self::slices()
            .iter()
            .copied()
            .find(|slice| Self::slice_key(*slice) == key)
    }

    /// Whether `slice` differs between `self` and `previous`.
    ///
    /// Must be a cheap identity or version check, not a deep comparison.
    fn slice_changed(&self, previous: &Self, slice: Self::Slice) -> bool;

    /// Encode the full current value of a slice
    fn encode_slice(&self, slice: Self::Slice) -> StoreResult<String>;

    /// Decode a persisted slice into the action that seeds it
    fn restore_action(slice: Self::Slice, raw: &str) -> StoreResult<Self::Action>;
}
