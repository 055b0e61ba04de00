//! File-backed shared store.
//!
//! One JSON file per key inside a directory, so any process that can reach the
//! directory shares the records. Writes go through a temp file + rename so a
//! reader never sees a partial record.
//!
//! # File Format
//!
//! ```json
//! { "value": "1200000", "scope_path": "/", "written_at": "2026-01-01T00:00:00Z" }
//! ```
//!
//! Empty or corrupt files read as absent: the caller treats that as "no
//! information", the same as a missing record.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use super::{data_dir, normalize_scope, scope_visible, SharedStore, StoreConfig, WriteOptions};
use crate::error::StoreError;

#[derive(Debug, Serialize, Deserialize)]
struct RecordFile {
    value: String,
    #[serde(default = "root_scope")]
    scope_path: String,
    #[serde(default)]
    written_at: Option<DateTime<Utc>>,
}

fn root_scope() -> String {
    "/".to_string()
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    context_path: String,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`, viewed from `/`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            context_path: "/".to_string(),
        })
    }

    /// Open the store under `data_dir()/shared`.
    pub fn open_default() -> Result<Self, StoreError> {
        let base = data_dir().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::open(base.join("shared"))
    }

    /// Open the directory named by `config.directory`, or the default one.
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        match &config.directory {
            Some(dir) => Self::open(dir),
            None => Self::open_default(),
        }
    }

    /// The same directory seen from another context path.
    pub fn for_context(&self, context_path: impl Into<String>) -> Self {
        Self {
            dir: self.dir.clone(),
            context_path: context_path.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }

    fn load_record(&self, key: &str) -> Result<Option<RecordFile>, StoreError> {
        let path = self.record_path(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<RecordFile>(&content) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Ignoring corrupt shared record");
                Ok(None)
            }
        }
    }
}

impl SharedStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .load_record(key)?
            .filter(|r| scope_visible(&r.scope_path, &self.context_path))
            .map(|r| r.value))
    }

    fn write(&self, key: &str, value: &str, options: &WriteOptions) -> Result<(), StoreError> {
        let path = self.record_path(key);
        let record = RecordFile {
            value: value.to_string(),
            scope_path: normalize_scope(options.scope()),
            written_at: Some(Utc::now()),
        };
        let content = serde_json::to_string(&record).map_err(|e| StoreError::Encode {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        temp_file.write_all(content.as_bytes()).map_err(io_err)?;
        temp_file.flush().map_err(io_err)?;
        temp_file.persist(&path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    fn remove(&self, key: &str, options: &WriteOptions) -> Result<(), StoreError> {
        let scope = normalize_scope(options.scope());
        match self.load_record(key)? {
            Some(record) if normalize_scope(&record.scope_path) == scope => {}
            _ => return Ok(()),
        }
        let path = self.record_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}
