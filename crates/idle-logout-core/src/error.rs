//! Core error types for idle-logout-core.
//!
//! Configuration mistakes fail fast at construction. Store failures are
//! recoverable (the controller degrades to local-only timing) and only reach
//! callers from explicit store operations. Logout failures are surfaced to the
//! caller of the transition that attempted the logout.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for idle-logout-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Shared store errors
    #[error("Shared store error: {0}")]
    Store(#[from] StoreError),

    /// The logout collaborator failed
    #[error(transparent)]
    Logout(#[from] LogoutError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The warning window does not fit inside the idle budget
    #[error(
        "countdown_duration_seconds ({countdown_secs}) must not exceed idle_duration_seconds ({idle_secs})"
    )]
    CountdownExceedsIdle { countdown_secs: i64, idle_secs: i64 },

    /// A duration was configured below zero
    #[error("Negative duration for '{key}': {value}")]
    NegativeDuration { key: String, value: i64 },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Shared store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Storage is disabled or otherwise unreachable
    #[error("Shared store unavailable: {0}")]
    Unavailable(String),

    /// Filesystem failure in a file-backed store
    #[error("Shared store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded for storage
    #[error("Failed to encode record for '{key}': {message}")]
    Encode { key: String, message: String },
}

/// Failure reported by the logout collaborator.
#[derive(Error, Debug)]
#[error("Logout failed: {message}")]
pub struct LogoutError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl LogoutError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
