//! Logging initialization.
//!
//! Configures the `tracing` subscriber with level filtering via the
//! `IDLE_LOGOUT_LOG` environment variable. Falls back to `info` when the
//! variable is unset or invalid.
//!
//! ```bash
//! IDLE_LOGOUT_LOG=debug my-host-app
//! IDLE_LOGOUT_LOG=idle_logout_core=trace,warn my-host-app
//! ```

use tracing_subscriber::{fmt, EnvFilter};

/// Filter directive variable.
pub const LOG_ENV_VAR: &str = "IDLE_LOGOUT_LOG";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber, writing to stderr.
///
/// # Panics
///
/// Panics if a global subscriber has already been set. Embedders that may
/// already have one should call [`try_init`].
pub fn init() {
    fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Like [`init`], but reports an already-installed subscriber as an error.
pub fn try_init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
}
