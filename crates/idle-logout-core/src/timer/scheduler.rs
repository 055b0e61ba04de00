use serde::{Deserialize, Serialize};

use crate::session::Trigger;

/// Which controller timer a callback belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
    /// Fires at `deadline - countdown`.
    Idle,
    /// Fires at `deadline`.
    Logout,
    /// Repeats while the countdown is visible.
    Tick,
}

/// Payload carried by every scheduled callback.
///
/// `deadline_ms` is the deadline the timer was computed against. The
/// controller compares it with its current deadline on firing and discards
/// the firing when they differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerTag {
    pub kind: TimerKind,
    pub deadline_ms: u64,
}

impl TimerTag {
    pub fn idle(deadline_ms: u64) -> Self {
        Self {
            kind: TimerKind::Idle,
            deadline_ms,
        }
    }

    pub fn logout(deadline_ms: u64) -> Self {
        Self {
            kind: TimerKind::Logout,
            deadline_ms,
        }
    }

    pub fn tick(deadline_ms: u64) -> Self {
        Self {
            kind: TimerKind::Tick,
            deadline_ms,
        }
    }

    /// The trigger the controller receives when this timer fires.
    pub fn into_trigger(self) -> Trigger {
        match self.kind {
            TimerKind::Idle => Trigger::IdleTimerFired {
                deadline_ms: self.deadline_ms,
            },
            TimerKind::Logout => Trigger::LogoutTimerFired {
                deadline_ms: self.deadline_ms,
            },
            TimerKind::Tick => Trigger::Tick,
        }
    }
}

/// Opaque handle to a scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub(crate) u64);

/// Delayed and repeating callbacks, abstracted from the platform primitive.
///
/// Implementations deliver a fired [`TimerTag`] back to whoever drives the
/// controller; they never call into the controller themselves. The scheduler
/// does not enforce "one timer per kind": the controller cancels the previous
/// handle before scheduling a replacement.
pub trait TimerScheduler: Send {
    /// Fire `tag` once after `delay_ms`. A zero delay fires as soon as possible.
    fn schedule_once(&mut self, delay_ms: u64, tag: TimerTag) -> TimerHandle;

    /// Fire `tag` every `interval_ms`, first firing one interval from now.
    fn schedule_repeating(&mut self, interval_ms: u64, tag: TimerTag) -> TimerHandle;

    /// Cancel a pending timer. Unknown or already-fired handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);
}
