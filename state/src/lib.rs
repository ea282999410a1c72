//! Tasknest State Management
//!
//! An observable, reducer-driven state container with write-through
//! persistence. State lives in memory and is the source of truth; each
//! whitelisted slice is mirrored to a string key-value backing store and
//! reloaded on startup.

pub mod app;
pub mod codec;
pub mod container;
pub mod gateway;
pub mod memory;
pub mod persistent;
pub mod reducers;
pub mod rehydrate;
pub mod selectors;
pub mod sink;
pub mod store;

#[cfg(test)]
mod testing;

pub use app::*;
pub use codec::*;
pub use container::*;
pub use gateway::*;
pub use memory::*;
pub use persistent::*;
pub use rehydrate::*;
pub use selectors::*;
pub use sink::*;
pub use store::*;
