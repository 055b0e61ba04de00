//! Activity bridge.
//!
//! Turns raw input event names (`mousemove`, `keydown`, ...) into
//! [`Trigger::Activity`]. Only bound names count, forwarding is rate limited
//! on the leading edge, and nothing is forwarded while the countdown is
//! visible.

use std::collections::HashSet;

use tracing::trace;

use crate::error::Result;
use crate::events::SessionEvent;
use crate::session::{IdleSessionController, Trigger};
use crate::storage::ActivityConfig;

#[derive(Debug, Clone)]
pub struct ActivityBridge {
    bound: HashSet<String>,
    debounce_ms: u64,
    last_forwarded_ms: Option<u64>,
}

impl ActivityBridge {
    pub fn new(config: &ActivityConfig) -> Self {
        Self {
            bound: config.events.iter().cloned().collect(),
            debounce_ms: u64::try_from(config.debounce_ms).unwrap_or(0),
            last_forwarded_ms: None,
        }
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bound.contains(name)
    }

    /// Decide whether the raw event `name` at `at_ms` becomes activity.
    ///
    /// The first event of a window is forwarded; later events within
    /// `debounce_ms` of it are dropped. Suppressed events do not open a
    /// window.
    pub fn observe(&mut self, name: &str, at_ms: u64, countdown_visible: bool) -> Option<Trigger> {
        if !self.is_bound(name) {
            return None;
        }
        if countdown_visible {
            trace!(event = name, "Countdown visible, dropping input");
            return None;
        }
        if let Some(last) = self.last_forwarded_ms {
            if at_ms >= last && at_ms - last < self.debounce_ms {
                return None;
            }
        }
        self.last_forwarded_ms = Some(at_ms);
        Some(Trigger::Activity { at_ms })
    }

    /// Observe `name` and feed the resulting activity to `controller`.
    pub fn forward(
        &mut self,
        controller: &mut IdleSessionController,
        name: &str,
        at_ms: u64,
    ) -> Result<Option<SessionEvent>> {
        match self.observe(name, at_ms, controller.countdown_visible()) {
            Some(trigger) => controller.handle(trigger),
            None => Ok(None),
        }
    }
}
