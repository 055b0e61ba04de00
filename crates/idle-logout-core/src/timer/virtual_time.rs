//! Deterministic scheduler for virtual time.
//!
//! Timers are kept in a queue keyed by due time and are only delivered when
//! the caller asks for them. [`drive_until`] pairs the queue with a
//! [`ManualClock`] and a controller, which is how the tests and multi-context
//! simulations run whole sessions without sleeping.

use std::sync::{Arc, Mutex, MutexGuard};

use super::scheduler::{TimerHandle, TimerScheduler, TimerTag};
use crate::clock::{Clock, ManualClock};
use crate::error::CoreError;
use crate::events::SessionEvent;
use crate::session::IdleSessionController;

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub handle: TimerHandle,
    pub due_ms: u64,
    pub tag: TimerTag,
}

/// A timer still waiting in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub handle: TimerHandle,
    pub due_ms: u64,
    pub tag: TimerTag,
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Default)]
struct Queue {
    next_id: u64,
    pending: Vec<PendingTimer>,
}

/// Cloneable handle to one context's virtual timer queue.
#[derive(Debug, Clone)]
pub struct VirtualScheduler {
    clock: ManualClock,
    queue: Arc<Mutex<Queue>>,
}

impl VirtualScheduler {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            queue: Arc::new(Mutex::new(Queue::default())),
        }
    }

    /// Due time of the earliest pending timer.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.lock().pending.iter().map(|t| t.due_ms).min()
    }

    /// Remove and return the earliest timer due at or before `until_ms`.
    ///
    /// Ties are broken by scheduling order. Repeating timers are re-queued one
    /// interval after their due time.
    pub fn pop_due(&self, until_ms: u64) -> Option<FiredTimer> {
        let mut queue = self.lock();
        let index = queue
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= until_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.handle))
            .map(|(i, _)| i)?;

        let timer = queue.pending.remove(index);
        if let Some(interval) = timer.interval_ms {
            queue.pending.push(PendingTimer {
                due_ms: timer.due_ms.saturating_add(interval),
                ..timer
            });
        }

        Some(FiredTimer {
            handle: timer.handle,
            due_ms: timer.due_ms,
            tag: timer.tag,
        })
    }

    /// Snapshot of every pending timer.
    pub fn pending(&self) -> Vec<PendingTimer> {
        let mut pending = self.lock().pending.clone();
        pending.sort_by_key(|t| (t.due_ms, t.handle));
        pending
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    fn insert(&self, delay_ms: u64, tag: TimerTag, interval_ms: Option<u64>) -> TimerHandle {
        let due_ms = self.clock.now_ms().saturating_add(delay_ms);
        let mut queue = self.lock();
        queue.next_id += 1;
        let handle = TimerHandle(queue.next_id);
        queue.pending.push(PendingTimer {
            handle,
            due_ms,
            tag,
            interval_ms,
        });
        handle
    }

    fn lock(&self) -> MutexGuard<'_, Queue> {
        // The queue holds plain data; a panic elsewhere cannot leave it torn.
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TimerScheduler for VirtualScheduler {
    fn schedule_once(&mut self, delay_ms: u64, tag: TimerTag) -> TimerHandle {
        self.insert(delay_ms, tag, None)
    }

    fn schedule_repeating(&mut self, interval_ms: u64, tag: TimerTag) -> TimerHandle {
        let interval_ms = interval_ms.max(1);
        self.insert(interval_ms, tag, Some(interval_ms))
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.lock().pending.retain(|t| t.handle != handle);
    }
}

/// Fire every timer due up to `until_ms`, in order, moving `clock` to each
/// firing's due time. Leaves the clock at `until_ms`.
///
/// Returns the events emitted along the way. Stops at the first transition
/// error (a failed logout) and returns it.
pub fn drive_until(
    controller: &mut IdleSessionController,
    timers: &VirtualScheduler,
    clock: &ManualClock,
    until_ms: u64,
) -> Result<Vec<SessionEvent>, CoreError> {
    let mut events = Vec::new();
    while let Some(fired) = timers.pop_due(until_ms) {
        if fired.due_ms > clock.now_ms() {
            clock.set(fired.due_ms);
        }
        if let Some(event) = controller.handle(fired.tag.into_trigger())? {
            events.push(event);
        }
    }
    if until_ms > clock.now_ms() {
        clock.set(until_ms);
    }
    Ok(events)
}
