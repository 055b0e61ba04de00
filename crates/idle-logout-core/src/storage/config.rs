//! TOML-based configuration.
//!
//! Holds the idle budget, countdown window, tick cadence, the raw input
//! events to treat as activity, and where the shared record lives.
//!
//! Configuration is stored at `~/.config/idle-logout/config.toml`.
//!
//! Durations are signed so that a negative value in the file is reported by
//! [`IdleLogoutConfig::validate`] instead of failing the parse.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::session::SessionTiming;

/// Activity bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Raw input event names treated as activity. Accepts a list or a
    /// whitespace-separated string.
    #[serde(
        default = "default_activity_events",
        deserialize_with = "deserialize_event_names"
    )]
    pub events: Vec<String>,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: i64,
}

/// Shared record location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_key")]
    pub key: String,
    /// Visibility scope of the record (cookie path).
    #[serde(default = "default_store_scope")]
    pub scope: String,
    /// Directory for the file-backed store. Defaults to `data_dir()/shared`.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Idle logout configuration.
///
/// Serialized to/from TOML at `~/.config/idle-logout/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleLogoutConfig {
    /// Total inactivity budget, countdown included.
    #[serde(default = "default_idle_duration_seconds")]
    pub idle_duration_seconds: i64,
    /// Warning window before logout.
    #[serde(default = "default_countdown_duration_seconds")]
    pub countdown_duration_seconds: i64,
    /// Countdown refresh cadence.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: i64,
    /// Countdown text; `{countdown}` is replaced with the seconds remaining.
    #[serde(default = "default_countdown_message")]
    pub countdown_message: String,
    /// Start the controller as soon as the runtime runs.
    #[serde(default = "default_true")]
    pub autostart: bool,
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

// Default functions
fn default_idle_duration_seconds() -> i64 {
    20 * 60
}
fn default_countdown_duration_seconds() -> i64 {
    30
}
fn default_tick_interval_ms() -> i64 {
    1000
}
fn default_countdown_message() -> String {
    "You will be logged out due to inactivity in {countdown} seconds.".into()
}
fn default_true() -> bool {
    true
}
fn default_activity_events() -> Vec<String> {
    split_event_names("mousemove mousedown mouseup keydown keyup focus blur")
}
fn default_debounce_ms() -> i64 {
    250
}
fn default_store_key() -> String {
    "idleLogout-deadline".into()
}
fn default_store_scope() -> String {
    "/".into()
}

fn split_event_names(names: &str) -> Vec<String> {
    names.split_whitespace().map(str::to_string).collect()
}

fn deserialize_event_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum EventNames {
        Spaced(String),
        List(Vec<String>),
    }

    Ok(match EventNames::deserialize(deserializer)? {
        EventNames::Spaced(names) => split_event_names(&names),
        EventNames::List(names) => names,
    })
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            events: default_activity_events(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key: default_store_key(),
            scope: default_store_scope(),
            directory: None,
        }
    }
}

impl Default for IdleLogoutConfig {
    fn default() -> Self {
        Self {
            idle_duration_seconds: default_idle_duration_seconds(),
            countdown_duration_seconds: default_countdown_duration_seconds(),
            tick_interval_ms: default_tick_interval_ms(),
            countdown_message: default_countdown_message(),
            autostart: true,
            activity: ActivityConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl IdleLogoutConfig {
    /// Check every duration and produce the millisecond timing the controller
    /// runs on. Nothing is clamped.
    pub fn validate(&self) -> Result<SessionTiming, ConfigError> {
        let idle = non_negative("idle_duration_seconds", self.idle_duration_seconds)?;
        let countdown = non_negative("countdown_duration_seconds", self.countdown_duration_seconds)?;
        let tick = non_negative("tick_interval_ms", self.tick_interval_ms)?;
        non_negative("activity.debounce_ms", self.activity.debounce_ms)?;

        if countdown > idle {
            return Err(ConfigError::CountdownExceedsIdle {
                countdown_secs: self.countdown_duration_seconds,
                idle_secs: self.idle_duration_seconds,
            });
        }
        if tick == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tick_interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.store.key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "store.key".into(),
                message: "must not be empty".into(),
            });
        }

        Ok(SessionTiming {
            idle_ms: idle.saturating_mul(1000),
            countdown_ms: countdown.saturating_mul(1000),
            tick_interval_ms: tick,
        })
    }

    /// Countdown text for `seconds` remaining.
    pub fn render_countdown_message(&self, seconds: u64) -> String {
        self.countdown_message
            .replace("{countdown}", &seconds.to_string())
    }

    /// Parse from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Default location: `data_dir()/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("~/.config/idle-logout"),
                message: e.to_string(),
            })
    }

    /// Load from the default location or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(&path)?;
                Ok(cfg)
            }
        }
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: err.to_string(),
            }),
        }
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

fn non_negative(key: &str, value: i64) -> Result<u64, ConfigError> {
    u64::try_from(value).map_err(|_| ConfigError::NegativeDuration {
        key: key.to_string(),
        value,
    })
}
