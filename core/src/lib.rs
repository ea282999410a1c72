//! Tasknest Core Library
//!
//! Domain types, the error taxonomy, and the traits that every part of the
//! Tasknest state store is built on: backing stores, codecs, reducers and
//! error sinks.

pub mod types;
pub mod traits;
pub mod error;
pub mod config;

pub use types::*;
pub use traits::*;
pub use error::*;
pub use config::*;
