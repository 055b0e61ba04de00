use tracing::debug;

use super::{SharedStore, WriteOptions};
use crate::error::StoreError;

/// The shared deadline record: one decimal millisecond timestamp under one key.
pub struct SharedDeadlineStore {
    store: Box<dyn SharedStore>,
    key: String,
    options: WriteOptions,
}

impl SharedDeadlineStore {
    pub fn new(store: Box<dyn SharedStore>, key: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            options: WriteOptions::scoped(scope),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn scope(&self) -> &str {
        self.options.scope()
    }

    /// Current shared deadline. A malformed value reads as `None`.
    pub fn read(&self) -> Result<Option<u64>, StoreError> {
        let Some(raw) = self.store.read(&self.key)? else {
            return Ok(None);
        };
        match raw.trim().parse::<u64>() {
            Ok(deadline_ms) => Ok(Some(deadline_ms)),
            Err(_) => {
                debug!(key = %self.key, value = %raw, "Ignoring malformed shared deadline");
                Ok(None)
            }
        }
    }

    pub fn write(&self, deadline_ms: u64) -> Result<(), StoreError> {
        self.store
            .write(&self.key, &deadline_ms.to_string(), &self.options)
    }

    /// Remove the record (after logout, or an explicit reset).
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(&self.key, &self.options)
    }
}
