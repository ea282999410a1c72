//! Slice codecs
//!
//! Every persisted slice is stored as a self-contained text blob under its
//! own key. Decoding failures always surface as `StoreError::Corruption`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::marker::PhantomData;
use tasknest_core::{Codec, StoreError, StoreResult, Task, TaskId, Theme};

/// JSON codec for any serde type
pub struct JsonCodec<T> {
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    /// `key` only labels corruption errors
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> StoreResult<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode(&self, raw: &str) -> StoreResult<T> {
        serde_json::from_str(raw).map_err(|e| StoreError::corruption(self.key, e))
    }
}

/// Task list codec: a JSON array with unique task identifiers
pub struct TaskListCodec {
    json: JsonCodec<Vec<Task>>,
}

impl TaskListCodec {
    pub const fn new(key: &'static str) -> Self {
        Self {
            json: JsonCodec::new(key),
        }
    }
}

impl Codec<Vec<Task>> for TaskListCodec {
    fn encode(&self, value: &Vec<Task>) -> StoreResult<String> {
        self.json.encode(value)
    }

    fn decode(&self, raw: &str) -> StoreResult<Vec<Task>> {
        let tasks = self.json.decode(raw)?;
        match first_duplicate_id(&tasks) {
            Some(id) => Err(StoreError::corruption(
                self.json.key,
                format!("duplicate task id {}", id),
            )),
            None => Ok(tasks),
        }
    }
}

/// Titles are not checked here: whatever the reducer accepted must decode
fn first_duplicate_id(tasks: &[Task]) -> Option<TaskId> {
    let mut seen = HashSet::with_capacity(tasks.len());
    tasks
        .iter()
        .find(|&task| !seen.insert(&task.id))
        .map(|task| task.id.clone())
}

/// Theme codec storing the bare name (`light` / `dark`)
pub struct ThemeCodec {
    key: &'static str,
}

impl ThemeCodec {
    pub const fn new(key: &'static str) -> Self {
        Self { key }
    }
}

impl Codec<Theme> for ThemeCodec {
    fn encode(&self, value: &Theme) -> StoreResult<String> {
        Ok(value.as_str().to_string())
    }

    fn decode(&self, raw: &str) -> StoreResult<Theme> {
        raw.trim()
            .parse()
            .map_err(|_| StoreError::corruption(self.key, format!("unknown theme '{}'", raw)))
    }
}
