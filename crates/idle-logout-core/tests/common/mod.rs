//! Multi-context harness: several controllers on one virtual clock.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use idle_logout_core::{
    Clock, CoreError, IdleLogoutConfig, IdleSessionController, LogoutError, ManualClock,
    SessionEvent, SessionParts, SharedStore, VirtualScheduler,
};

pub const KEY: &str = "idleLogout-deadline";

pub fn config(idle_secs: i64, countdown_secs: i64) -> IdleLogoutConfig {
    IdleLogoutConfig {
        idle_duration_seconds: idle_secs,
        countdown_duration_seconds: countdown_secs,
        tick_interval_ms: 1000,
        ..Default::default()
    }
}

/// One tab/window of the session.
pub struct Context {
    pub controller: IdleSessionController,
    pub timers: VirtualScheduler,
    pub events: Vec<SessionEvent>,
    logouts: Arc<AtomicUsize>,
}

impl Context {
    pub fn new(
        config: &IdleLogoutConfig,
        clock: &ManualClock,
        store: impl SharedStore + 'static,
    ) -> Self {
        let timers = VirtualScheduler::new(clock.clone());
        let logouts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&logouts);
        let controller = IdleSessionController::new(
            config,
            SessionParts {
                clock: Arc::new(clock.clone()),
                store: Box::new(store),
                timers: Box::new(timers.clone()),
                logout: Box::new(move || -> Result<(), LogoutError> {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            },
        )
        .unwrap();
        Self {
            controller,
            timers,
            events: Vec::new(),
            logouts,
        }
    }

    pub fn started(mut self) -> Self {
        self.controller.start();
        self
    }

    pub fn logout_count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

/// Fire every timer due up to `until_ms` across `contexts`, in due order
/// (ties go to the lower index). `observe` runs after each firing with the
/// index of the context that handled it.
pub fn drive_contexts(
    contexts: &mut [Context],
    clock: &ManualClock,
    until_ms: u64,
    mut observe: impl FnMut(&[Context], usize),
) -> Result<(), CoreError> {
    loop {
        let next = contexts
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.timers.next_due_ms().map(|due| (due, i)))
            .filter(|(due, _)| *due <= until_ms)
            .min();
        let Some((due, index)) = next else { break };

        if due > clock.now_ms() {
            clock.set(due);
        }
        let fired = contexts[index].timers.pop_due(due).unwrap();
        if let Some(event) = contexts[index]
            .controller
            .handle(fired.tag.into_trigger())?
        {
            contexts[index].events.push(event);
        }
        observe(contexts, index);
    }
    if clock.now_ms() < until_ms {
        clock.set(until_ms);
    }
    Ok(())
}

/// Like [`drive_contexts`] without an observer.
pub fn drive_all(contexts: &mut [Context], clock: &ManualClock, until_ms: u64) {
    drive_contexts(contexts, clock, until_ms, |_, _| {}).unwrap();
}

pub fn shared_deadline(store: &dyn SharedStore) -> Option<u64> {
    store.read(KEY).unwrap().and_then(|v| v.parse().ok())
}
