//! Timer scheduler backed by tokio tasks.
//!
//! Each timer is a spawned task that sleeps and then sends its [`TimerTag`]
//! into a channel owned by the event loop. Cancelling aborts the task. A tag
//! that was already sent before the abort is still delivered; the
//! controller's deadline check discards it.
//!
//! Must be used from within a tokio runtime.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::scheduler::{TimerHandle, TimerScheduler, TimerTag};

pub struct TokioScheduler {
    fired: mpsc::UnboundedSender<TimerTag>,
    tasks: HashMap<TimerHandle, AbortHandle>,
    next_id: u64,
}

impl TokioScheduler {
    /// Create a scheduler and the receiver its firings arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerTag>) {
        let (fired, rx) = mpsc::unbounded_channel();
        (
            Self {
                fired,
                tasks: HashMap::new(),
                next_id: 0,
            },
            rx,
        )
    }

    pub fn active_count(&self) -> usize {
        self.tasks.values().filter(|t| !t.is_finished()).count()
    }

    fn next_handle(&mut self) -> TimerHandle {
        self.next_id += 1;
        // Finished one-shot tasks are dropped lazily here.
        self.tasks.retain(|_, task| !task.is_finished());
        TimerHandle(self.next_id)
    }
}

impl TimerScheduler for TokioScheduler {
    fn schedule_once(&mut self, delay_ms: u64, tag: TimerTag) -> TimerHandle {
        let handle = self.next_handle();
        let fired = self.fired.clone();
        let task = tokio::spawn(async move {
            time::sleep(Duration::from_millis(delay_ms)).await;
            let _ = fired.send(tag);
        });
        self.tasks.insert(handle, task.abort_handle());
        handle
    }

    fn schedule_repeating(&mut self, interval_ms: u64, tag: TimerTag) -> TimerHandle {
        let handle = self.next_handle();
        let fired = self.fired.clone();
        let period = Duration::from_millis(interval_ms.max(1));
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if fired.send(tag).is_err() {
                    break;
                }
            }
        });
        self.tasks.insert(handle, task.abort_handle());
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
