use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionState;

/// Every visible state change produces an Event.
/// The countdown UI renders from these; the logout path listens for `LoggedOut`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Countdown UI should become visible.
    CountdownStarted {
        /// Configured warning window.
        seconds_total: u64,
        /// Actual time left; lower than `seconds_total` when the idle timer
        /// fired late (suspended context).
        seconds_remaining: u64,
        deadline_ms: u64,
        at: DateTime<Utc>,
    },
    CountdownTick {
        seconds_remaining: u64,
        at: DateTime<Utc>,
    },
    /// Countdown UI should be hidden.
    CountdownCancelled {
        reason: CancelReason,
        /// Deadline in force after the cancellation.
        deadline_ms: u64,
        at: DateTime<Utc>,
    },
    LoggedOut {
        deadline_ms: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SessionState,
        deadline_ms: u64,
        countdown_starts_at_ms: u64,
        seconds_remaining: u64,
        degraded: bool,
        at: DateTime<Utc>,
    },
}

/// Why a visible countdown was withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// The user dismissed the dialog.
    Dismissed,
    /// Another context registered more recent activity.
    RemoteActivity,
    /// The controller was stopped.
    Stopped,
}

/// Converts a controller timestamp into the event time format.
pub(crate) fn event_time(epoch_ms: u64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms as i64).unwrap_or_default()
}
