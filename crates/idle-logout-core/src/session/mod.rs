//! The idle session state machine.
//!
//! ```text
//! Idle --idle timer (in sync)--> CountingDown --logout timer--> LoggedOut
//!  ^                                  |
//!  +---- cancel / remote activity ----+
//! ```

mod controller;
mod reconcile;

pub use controller::{IdleSessionController, SessionParts};
pub use reconcile::{classify_drift, Drift};

use serde::{Deserialize, Serialize};

use crate::error::LogoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Normal operation; activity pushes the deadline out.
    Idle,
    /// Warning visible, deadline fixed, ticking.
    CountingDown,
    /// Terminal.
    LoggedOut,
}

/// Everything that can drive a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// User activity observed at `at_ms`.
    Activity { at_ms: u64 },
    /// The idle timer scheduled for `deadline_ms` fired.
    IdleTimerFired { deadline_ms: u64 },
    /// Countdown refresh.
    Tick,
    /// The user dismissed the countdown dialog.
    CancelRequested,
    /// The logout timer scheduled for `deadline_ms` fired.
    LogoutTimerFired { deadline_ms: u64 },
}

/// Validated durations, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Total inactivity budget, countdown included.
    pub idle_ms: u64,
    pub countdown_ms: u64,
    pub tick_interval_ms: u64,
}

/// The final logout action (navigate away, revoke a token, ...).
pub trait LogoutAction: Send {
    fn perform_logout(&mut self) -> Result<(), LogoutError>;
}

impl<F> LogoutAction for F
where
    F: FnMut() -> Result<(), LogoutError> + Send,
{
    fn perform_logout(&mut self) -> Result<(), LogoutError> {
        self()
    }
}
