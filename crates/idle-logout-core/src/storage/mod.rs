//! Shared store abstraction and the persistence around it.
//!
//! The shared store is a last-write-wins key/value register visible to every
//! context of a session. Nothing here offers transactions or compare-and-swap;
//! the reconciliation protocol in [`crate::session`] is built to be correct
//! without them.

mod config;
mod deadline;
mod file;
mod memory;

pub use config::{ActivityConfig, IdleLogoutConfig, StoreConfig};
pub use deadline::SharedDeadlineStore;
pub use file::FileStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::StoreError;

/// Options attached to a write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Visibility scope of the written value (a cookie path). `None` means `/`.
    #[serde(default)]
    pub scope_path: Option<String>,
}

impl WriteOptions {
    pub fn scoped(path: impl Into<String>) -> Self {
        Self {
            scope_path: Some(path.into()),
        }
    }

    pub fn scope(&self) -> &str {
        self.scope_path.as_deref().unwrap_or("/")
    }
}

/// External key/value storage shared by all contexts.
///
/// Same-process reads after a write are immediate; cross-context visibility
/// may lag. Implementations report disabled or broken storage as
/// [`StoreError::Unavailable`] or [`StoreError::Io`].
pub trait SharedStore: Send {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn write(&self, key: &str, value: &str, options: &WriteOptions) -> Result<(), StoreError>;

    fn remove(&self, key: &str, options: &WriteOptions) -> Result<(), StoreError>;
}

/// Cookie path matching: is a record scoped to `scope` visible from a
/// context at `context_path`?
pub(crate) fn scope_visible(scope: &str, context_path: &str) -> bool {
    let scope = normalize_scope(scope);
    let context = normalize_scope(context_path);
    if scope == "/" || scope == context {
        return true;
    }
    context
        .strip_prefix(scope.as_str())
        .is_some_and(|rest| rest.starts_with('/'))
}

pub(crate) fn normalize_scope(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return "/".to_string();
    }
    let with_root = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    with_root.trim_end_matches('/').to_string()
}

/// Returns `~/.config/idle-logout[-dev]/` based on IDLE_LOGOUT_ENV.
///
/// Set IDLE_LOGOUT_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("IDLE_LOGOUT_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("idle-logout-dev")
    } else {
        base_dir.join("idle-logout")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
