//! In-process shared store.
//!
//! Clones (and [`MemoryStore::for_context`] views) share one record map, so
//! several controllers in the same process behave like several tabs sharing a
//! cookie jar. Writes are visible immediately.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{normalize_scope, scope_visible, SharedStore, WriteOptions};
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct Record {
    value: String,
    scope: String,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, Record>>>,
    available: Arc<AtomicBool>,
    context_path: String,
}

impl MemoryStore {
    /// A store viewed from the root path.
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
            context_path: "/".to_string(),
        }
    }

    /// Another view over the same records, seen from `context_path`.
    pub fn for_context(&self, context_path: impl Into<String>) -> Self {
        Self {
            records: Arc::clone(&self.records),
            available: Arc::clone(&self.available),
            context_path: context_path.into(),
        }
    }

    /// Simulate storage being disabled (`false`) or restored (`true`) for
    /// every view of this store.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    fn records(&self) -> Result<MutexGuard<'_, HashMap<String, Record>>, StoreError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store disabled".to_string()));
        }
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let records = self.records()?;
        Ok(records
            .get(key)
            .filter(|r| scope_visible(&r.scope, &self.context_path))
            .map(|r| r.value.clone()))
    }

    fn write(&self, key: &str, value: &str, options: &WriteOptions) -> Result<(), StoreError> {
        let mut records = self.records()?;
        records.insert(
            key.to_string(),
            Record {
                value: value.to_string(),
                scope: normalize_scope(options.scope()),
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str, options: &WriteOptions) -> Result<(), StoreError> {
        let mut records = self.records()?;
        let scope = normalize_scope(options.scope());
        if records.get(key).is_some_and(|r| r.scope == scope) {
            records.remove(key);
        }
        Ok(())
    }
}
