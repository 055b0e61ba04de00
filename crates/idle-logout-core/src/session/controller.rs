//! Idle session controller.
//!
//! One controller per context. It owns the local deadline, the countdown
//! state and the three timer handles, and keeps the deadline consistent with
//! the shared record written by every other context.
//!
//! The controller never runs timers itself: the driver feeds it [`Trigger`]s
//! (from an activity bridge, a timer scheduler, a dialog) and each call to
//! [`IdleSessionController::handle`] runs one transition to completion.
//!
//! ## Usage
//!
//! ```ignore
//! let mut controller = IdleSessionController::new(&config, parts)?;
//! controller.start();
//! // For every fired timer, input event or dialog action:
//! if let Some(event) = controller.handle(trigger)? { render(event) }
//! ```

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::reconcile::{classify_drift, Drift};
use super::{LogoutAction, SessionState, SessionTiming, Trigger};
use crate::clock::Clock;
use crate::error::{ConfigError, Result, StoreError};
use crate::events::{event_time, CancelReason, SessionEvent};
use crate::storage::{IdleLogoutConfig, SharedDeadlineStore, SharedStore};
use crate::timer::{TimerHandle, TimerScheduler, TimerTag};

/// Collaborators injected into a controller.
pub struct SessionParts {
    pub clock: Arc<dyn Clock>,
    pub store: Box<dyn SharedStore>,
    pub timers: Box<dyn TimerScheduler>,
    pub logout: Box<dyn LogoutAction>,
}

enum Reconciled {
    Proceed,
    Adopted { countdown_cancelled: bool },
}

pub struct IdleSessionController {
    timing: SessionTiming,
    clock: Arc<dyn Clock>,
    shared: SharedDeadlineStore,
    timers: Box<dyn TimerScheduler>,
    logout: Box<dyn LogoutAction>,
    state: SessionState,
    /// Absolute logout time (epoch ms).
    deadline_ms: u64,
    running: bool,
    started_once: bool,
    /// Shared store unreachable; running on the local deadline only.
    degraded: bool,
    idle_timer: Option<TimerHandle>,
    logout_timer: Option<TimerHandle>,
    tick_timer: Option<TimerHandle>,
}

impl IdleSessionController {
    /// Validate `config` and build a stopped controller.
    ///
    /// Construction counts as the first activity: the deadline is
    /// `now + idle`. No timer is scheduled until [`start`](Self::start).
    pub fn new(config: &IdleLogoutConfig, parts: SessionParts) -> Result<Self, ConfigError> {
        let timing = config.validate()?;
        let deadline_ms = parts.clock.now_ms().saturating_add(timing.idle_ms);
        Ok(Self {
            timing,
            clock: parts.clock,
            shared: SharedDeadlineStore::new(parts.store, &config.store.key, &config.store.scope),
            timers: parts.timers,
            logout: parts.logout,
            state: SessionState::Idle,
            deadline_ms,
            running: false,
            started_once: false,
            degraded: false,
            idle_timer: None,
            logout_timer: None,
            tick_timer: None,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn deadline_ms(&self) -> u64 {
        self.deadline_ms
    }

    pub fn countdown_starts_at_ms(&self) -> u64 {
        self.deadline_ms.saturating_sub(self.timing.countdown_ms)
    }

    /// `ceil((deadline - now) / 1000)`, never negative.
    pub fn seconds_remaining(&self) -> u64 {
        let remaining_ms = self.deadline_ms.saturating_sub(self.clock.now_ms());
        remaining_ms.div_ceil(1000)
    }

    pub fn countdown_visible(&self) -> bool {
        self.state == SessionState::CountingDown
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn timing(&self) -> SessionTiming {
        self.timing
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> SessionEvent {
        SessionEvent::StateSnapshot {
            state: self.state,
            deadline_ms: self.deadline_ms,
            countdown_starts_at_ms: self.countdown_starts_at_ms(),
            seconds_remaining: self.seconds_remaining(),
            degraded: self.degraded,
            at: event_time(self.clock.now_ms()),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Publish the deadline and arm the idle and logout timers.
    ///
    /// A restart after [`stop`](Self::stop) re-anchors the deadline at
    /// `now + idle`. No-op when running or logged out.
    pub fn start(&mut self) {
        if self.running || self.state == SessionState::LoggedOut {
            return;
        }
        if self.started_once {
            self.deadline_ms = self.clock.now_ms().saturating_add(self.timing.idle_ms);
        }
        self.running = true;
        self.started_once = true;
        self.publish();
        self.arm_timers();
        info!(deadline_ms = self.deadline_ms, "Idle session started");
    }

    /// Cancel every timer. A visible countdown is withdrawn.
    pub fn stop(&mut self) -> Option<SessionEvent> {
        if !self.running {
            return None;
        }
        self.running = false;
        self.cancel_all_timers();
        info!(state = ?self.state, "Idle session stopped");
        if self.state == SessionState::CountingDown {
            self.state = SessionState::Idle;
            return Some(self.cancelled(CancelReason::Stopped));
        }
        None
    }

    /// Activity at the current time.
    pub fn record_activity(&mut self) -> Result<Option<SessionEvent>> {
        let at_ms = self.clock.now_ms();
        self.handle(Trigger::Activity { at_ms })
    }

    /// The user dismissed the countdown dialog.
    pub fn request_cancel(&mut self) -> Result<Option<SessionEvent>> {
        self.handle(Trigger::CancelRequested)
    }

    /// Run one transition.
    ///
    /// Returns the event the UI should render, if any. The only error is a
    /// failed logout action; the controller is `LoggedOut` regardless.
    pub fn handle(&mut self, trigger: Trigger) -> Result<Option<SessionEvent>> {
        if !self.running {
            debug!(?trigger, state = ?self.state, "Controller inactive, ignoring trigger");
            return Ok(None);
        }

        match (self.state, trigger) {
            (SessionState::LoggedOut, _) => Ok(None),

            (SessionState::Idle, Trigger::Activity { at_ms }) => {
                self.apply_activity(at_ms);
                Ok(None)
            }
            (SessionState::CountingDown, Trigger::Activity { .. }) => {
                debug!("Countdown visible, ignoring activity");
                Ok(None)
            }

            (SessionState::Idle, Trigger::IdleTimerFired { deadline_ms })
                if deadline_ms == self.deadline_ms =>
            {
                Ok(self.on_idle_reached())
            }
            (_, Trigger::IdleTimerFired { deadline_ms }) => {
                self.discard("idle", deadline_ms);
                Ok(None)
            }

            (SessionState::CountingDown, Trigger::Tick) => Ok(Some(self.on_tick())),
            (SessionState::Idle, Trigger::Tick) => Ok(None),

            (SessionState::CountingDown, Trigger::CancelRequested) => Ok(Some(self.on_dismissed())),
            (SessionState::Idle, Trigger::CancelRequested) => Ok(None),

            (_, Trigger::LogoutTimerFired { deadline_ms }) if deadline_ms == self.deadline_ms => {
                self.on_logout_reached()
            }
            (_, Trigger::LogoutTimerFired { deadline_ms }) => {
                self.discard("logout", deadline_ms);
                Ok(None)
            }
        }
    }

    // ── Transitions ──────────────────────────────────────────────────

    fn apply_activity(&mut self, at_ms: u64) {
        self.deadline_ms = at_ms.saturating_add(self.timing.idle_ms);
        self.publish();
        self.arm_timers();
    }

    fn on_idle_reached(&mut self) -> Option<SessionEvent> {
        if let Reconciled::Adopted { .. } = self.reconcile() {
            return None;
        }

        self.state = SessionState::CountingDown;
        let tag = TimerTag::tick(self.deadline_ms);
        self.tick_timer = Some(self.timers.schedule_repeating(self.timing.tick_interval_ms, tag));

        let seconds_remaining = self.seconds_remaining();
        info!(
            deadline_ms = self.deadline_ms,
            seconds_remaining, "Countdown started"
        );
        Some(SessionEvent::CountdownStarted {
            seconds_total: self.timing.countdown_ms.div_ceil(1000),
            seconds_remaining,
            deadline_ms: self.deadline_ms,
            at: event_time(self.clock.now_ms()),
        })
    }

    fn on_tick(&mut self) -> SessionEvent {
        match self.reconcile() {
            Reconciled::Adopted { .. } => self.cancelled(CancelReason::RemoteActivity),
            Reconciled::Proceed => SessionEvent::CountdownTick {
                seconds_remaining: self.seconds_remaining(),
                at: event_time(self.clock.now_ms()),
            },
        }
    }

    fn on_dismissed(&mut self) -> SessionEvent {
        self.end_countdown();
        let now = self.clock.now_ms();
        self.apply_activity(now);
        info!(deadline_ms = self.deadline_ms, "Countdown dismissed");
        self.cancelled(CancelReason::Dismissed)
    }

    fn on_logout_reached(&mut self) -> Result<Option<SessionEvent>> {
        match self.reconcile() {
            Reconciled::Adopted {
                countdown_cancelled: true,
            } => return Ok(Some(self.cancelled(CancelReason::RemoteActivity))),
            Reconciled::Adopted { .. } => return Ok(None),
            Reconciled::Proceed => {}
        }

        self.cancel_all_timers();
        self.state = SessionState::LoggedOut;
        self.running = false;

        if let Err(err) = self.logout.perform_logout() {
            warn!(error = %err, "Logout action failed");
            return Err(err.into());
        }
        if let Err(err) = self.shared.clear() {
            warn!(error = %err, "Failed to clear shared deadline after logout");
        }
        info!(deadline_ms = self.deadline_ms, "Logged out after inactivity");
        Ok(Some(SessionEvent::LoggedOut {
            deadline_ms: self.deadline_ms,
            at: event_time(self.clock.now_ms()),
        }))
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Compare with the shared record; adopt a later deadline or push ours.
    fn reconcile(&mut self) -> Reconciled {
        let shared = match self.shared.read() {
            Ok(shared) => {
                self.store_recovered();
                shared
            }
            Err(err) => {
                self.store_failed(&err);
                return Reconciled::Proceed;
            }
        };

        match classify_drift(self.deadline_ms, shared) {
            Drift::InSync => Reconciled::Proceed,
            Drift::SharedAhead(shared_ms) => {
                info!(
                    local_ms = self.deadline_ms,
                    shared_ms, "Adopting deadline from another context"
                );
                let countdown_cancelled = self.state == SessionState::CountingDown;
                if countdown_cancelled {
                    self.end_countdown();
                }
                self.deadline_ms = shared_ms;
                self.arm_timers();
                Reconciled::Adopted {
                    countdown_cancelled,
                }
            }
            Drift::SharedBehind | Drift::SharedAbsent => {
                debug!(local_ms = self.deadline_ms, ?shared, "Shared deadline behind, overwriting");
                self.write_shared();
                Reconciled::Proceed
            }
        }
    }

    /// Write the local deadline unless the shared record is already at or
    /// past it. The shared value never moves backwards.
    fn publish(&mut self) {
        match self.shared.read() {
            Ok(Some(shared_ms)) if shared_ms >= self.deadline_ms => self.store_recovered(),
            Ok(_) => self.write_shared(),
            Err(err) => self.store_failed(&err),
        }
    }

    fn write_shared(&mut self) {
        match self.shared.write(self.deadline_ms) {
            Ok(()) => self.store_recovered(),
            Err(err) => self.store_failed(&err),
        }
    }

    fn store_failed(&mut self, err: &StoreError) {
        if self.degraded {
            debug!(error = %err, "Shared store still unavailable");
            return;
        }
        self.degraded = true;
        warn!(
            error = %err,
            key = %self.shared.key(),
            "Shared store unavailable; continuing without cross-context sync"
        );
    }

    fn store_recovered(&mut self) {
        if self.degraded {
            self.degraded = false;
            info!(key = %self.shared.key(), "Shared store available again");
        }
    }

    // ── Timers ───────────────────────────────────────────────────────

    /// Replace the idle and logout timers with ones for the current deadline.
    fn arm_timers(&mut self) {
        self.cancel(TimerSlot::Idle);
        self.cancel(TimerSlot::Logout);

        let now = self.clock.now_ms();
        let idle_delay = self.countdown_starts_at_ms().saturating_sub(now);
        let logout_delay = self.deadline_ms.saturating_sub(now);
        self.idle_timer = Some(
            self.timers
                .schedule_once(idle_delay, TimerTag::idle(self.deadline_ms)),
        );
        self.logout_timer = Some(
            self.timers
                .schedule_once(logout_delay, TimerTag::logout(self.deadline_ms)),
        );
    }

    fn end_countdown(&mut self) {
        self.cancel(TimerSlot::Tick);
        self.state = SessionState::Idle;
    }

    fn cancel_all_timers(&mut self) {
        self.cancel(TimerSlot::Idle);
        self.cancel(TimerSlot::Logout);
        self.cancel(TimerSlot::Tick);
    }

    fn cancel(&mut self, slot: TimerSlot) {
        let handle = match slot {
            TimerSlot::Idle => self.idle_timer.take(),
            TimerSlot::Logout => self.logout_timer.take(),
            TimerSlot::Tick => self.tick_timer.take(),
        };
        if let Some(handle) = handle {
            self.timers.cancel(handle);
        }
    }

    fn discard(&self, timer: &str, deadline_ms: u64) {
        debug!(
            timer,
            timer_deadline_ms = deadline_ms,
            deadline_ms = self.deadline_ms,
            state = ?self.state,
            "Discarding stale timer"
        );
    }

    fn cancelled(&self, reason: CancelReason) -> SessionEvent {
        SessionEvent::CountdownCancelled {
            reason,
            deadline_ms: self.deadline_ms,
            at: event_time(self.clock.now_ms()),
        }
    }
}

#[derive(Clone, Copy)]
enum TimerSlot {
    Idle,
    Logout,
    Tick,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{CoreError, LogoutError};
    use crate::storage::{MemoryStore, WriteOptions};
    use crate::timer::{drive_until, TimerKind, VirtualScheduler};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const KEY: &str = "idleLogout-deadline";

    struct Fixture {
        controller: IdleSessionController,
        clock: ManualClock,
        timers: VirtualScheduler,
        store: MemoryStore,
        logouts: Arc<AtomicUsize>,
    }

    fn config(idle_secs: i64, countdown_secs: i64) -> IdleLogoutConfig {
        IdleLogoutConfig {
            idle_duration_seconds: idle_secs,
            countdown_duration_seconds: countdown_secs,
            tick_interval_ms: 1000,
            ..Default::default()
        }
    }

    fn fixture_with(cfg: &IdleLogoutConfig, store: MemoryStore) -> Fixture {
        let clock = ManualClock::new(0);
        let timers = VirtualScheduler::new(clock.clone());
        let logouts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&logouts);
        let controller = IdleSessionController::new(
            cfg,
            SessionParts {
                clock: Arc::new(clock.clone()),
                store: Box::new(store.clone()),
                timers: Box::new(timers.clone()),
                logout: Box::new(move || -> Result<(), LogoutError> {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            },
        )
        .unwrap();
        Fixture {
            controller,
            clock,
            timers,
            store,
            logouts,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(&config(1200, 30), MemoryStore::new())
    }

    fn shared(store: &MemoryStore) -> Option<String> {
        store.read(KEY).unwrap()
    }

    #[test]
    fn construction_sets_deadline_but_schedules_nothing() {
        let f = fixture();
        assert_eq!(f.controller.deadline_ms(), 1_200_000);
        assert_eq!(f.controller.countdown_starts_at_ms(), 1_170_000);
        assert_eq!(f.timers.pending_count(), 0);
        assert_eq!(shared(&f.store), None);
        assert!(!f.controller.is_running());
    }

    #[test]
    fn start_publishes_and_arms_one_idle_and_one_logout_timer() {
        let mut f = fixture();
        f.controller.start();
        f.controller.start();

        assert_eq!(shared(&f.store).as_deref(), Some("1200000"));
        let pending = f.timers.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].tag, TimerTag::idle(1_200_000));
        assert_eq!(pending[0].due_ms, 1_170_000);
        assert_eq!(pending[1].tag, TimerTag::logout(1_200_000));
        assert_eq!(pending[1].due_ms, 1_200_000);
    }

    #[test]
    fn activity_moves_deadline_and_replaces_timers() {
        let mut f = fixture();
        f.controller.start();
        f.clock.set(500_000);
        f.controller
            .handle(Trigger::Activity { at_ms: 400_000 })
            .unwrap();

        assert_eq!(f.controller.deadline_ms(), 1_600_000);
        assert_eq!(shared(&f.store).as_deref(), Some("1600000"));
        let pending = f.timers.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].due_ms, 1_570_000);
        assert_eq!(pending[1].due_ms, 1_600_000);
    }

    #[test]
    fn activity_never_rewinds_shared_record() {
        let mut f = fixture();
        f.controller.start();
        f.store
            .write(KEY, "9000000", &WriteOptions::default())
            .unwrap();

        f.controller
            .handle(Trigger::Activity { at_ms: 10_000 })
            .unwrap();
        assert_eq!(f.controller.deadline_ms(), 1_210_000);
        assert_eq!(shared(&f.store).as_deref(), Some("9000000"));
    }

    #[test]
    fn stale_idle_timer_is_discarded() {
        let mut f = fixture();
        f.controller.start();
        f.controller
            .handle(Trigger::Activity { at_ms: 100_000 })
            .unwrap();

        f.clock.set(1_170_000);
        let event = f
            .controller
            .handle(Trigger::IdleTimerFired {
                deadline_ms: 1_200_000,
            })
            .unwrap();
        assert_eq!(event, None);
        assert_eq!(f.controller.state(), SessionState::Idle);

        let event = f
            .controller
            .handle(Trigger::LogoutTimerFired {
                deadline_ms: 1_200_000,
            })
            .unwrap();
        assert_eq!(event, None);
        assert_eq!(f.logouts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn full_countdown_to_logout() {
        let mut f = fixture();
        f.controller.start();

        let events = drive_until(&mut f.controller, &f.timers, &f.clock, 1_175_000).unwrap();
        assert!(matches!(
            events.first(),
            Some(SessionEvent::CountdownStarted {
                seconds_total: 30,
                seconds_remaining: 30,
                deadline_ms: 1_200_000,
                ..
            })
        ));
        assert!(matches!(
            events.last(),
            Some(SessionEvent::CountdownTick {
                seconds_remaining: 25,
                ..
            })
        ));
        assert!(f.controller.countdown_visible());

        let events = drive_until(&mut f.controller, &f.timers, &f.clock, 1_300_000).unwrap();
        assert!(matches!(
            events.last(),
            Some(SessionEvent::LoggedOut {
                deadline_ms: 1_200_000,
                ..
            })
        ));
        assert_eq!(f.controller.state(), SessionState::LoggedOut);
        assert_eq!(f.logouts.load(Ordering::SeqCst), 1);
        assert_eq!(f.timers.pending_count(), 0);
        assert_eq!(shared(&f.store), None);
    }

    #[test]
    fn activity_is_ignored_while_counting_down() {
        let mut f = fixture();
        f.controller.start();
        drive_until(&mut f.controller, &f.timers, &f.clock, 1_171_000).unwrap();
        assert!(f.controller.countdown_visible());

        f.controller.record_activity().unwrap();
        assert_eq!(f.controller.deadline_ms(), 1_200_000);
        assert_eq!(f.controller.state(), SessionState::CountingDown);
        assert_eq!(shared(&f.store).as_deref(), Some("1200000"));
    }

    #[test]
    fn dismissing_countdown_counts_as_activity() {
        let mut f = fixture();
        f.controller.start();
        drive_until(&mut f.controller, &f.timers, &f.clock, 1_180_000).unwrap();

        let event = f.controller.request_cancel().unwrap();
        assert!(matches!(
            event,
            Some(SessionEvent::CountdownCancelled {
                reason: CancelReason::Dismissed,
                deadline_ms: 2_380_000,
                ..
            })
        ));
        assert_eq!(f.controller.state(), SessionState::Idle);
        assert_eq!(shared(&f.store).as_deref(), Some("2380000"));

        let kinds: Vec<TimerKind> = f.timers.pending().iter().map(|t| t.tag.kind).collect();
        assert_eq!(kinds, vec![TimerKind::Idle, TimerKind::Logout]);
    }

    #[test]
    fn remote_activity_during_countdown_cancels_it() {
        let mut f = fixture();
        f.controller.start();
        drive_until(&mut f.controller, &f.timers, &f.clock, 1_180_000).unwrap();
        assert!(f.controller.countdown_visible());

        // Another context advanced the deadline.
        f.store
            .write(KEY, "1210000", &WriteOptions::default())
            .unwrap();

        f.clock.set(1_181_000);
        let event = f.controller.handle(Trigger::Tick).unwrap();
        assert!(matches!(
            event,
            Some(SessionEvent::CountdownCancelled {
                reason: CancelReason::RemoteActivity,
                deadline_ms: 1_210_000,
                ..
            })
        ));
        assert_eq!(f.controller.state(), SessionState::Idle);
        assert_eq!(f.controller.deadline_ms(), 1_210_000);
        assert!(f
            .timers
            .pending()
            .iter()
            .all(|t| t.tag.kind != TimerKind::Tick));
    }

    #[test]
    fn idle_timer_adopts_later_shared_deadline_without_countdown() {
        let mut f = fixture();
        f.controller.start();
        f.store
            .write(KEY, "1800000", &WriteOptions::default())
            .unwrap();

        let events = drive_until(&mut f.controller, &f.timers, &f.clock, 1_170_000).unwrap();
        assert!(events.is_empty());
        assert_eq!(f.controller.deadline_ms(), 1_800_000);
        assert_eq!(f.controller.state(), SessionState::Idle);
        assert_eq!(f.timers.next_due_ms(), Some(1_770_000));
    }

    #[test]
    fn behind_or_missing_shared_record_is_overwritten() {
        let mut f = fixture();
        f.controller.start();
        f.store.write(KEY, "5", &WriteOptions::default()).unwrap();

        drive_until(&mut f.controller, &f.timers, &f.clock, 1_170_000).unwrap();
        assert!(f.controller.countdown_visible());
        assert_eq!(shared(&f.store).as_deref(), Some("1200000"));

        f.store.remove(KEY, &WriteOptions::default()).unwrap();
        drive_until(&mut f.controller, &f.timers, &f.clock, 1_171_000).unwrap();
        assert_eq!(shared(&f.store).as_deref(), Some("1200000"));
    }

    #[test]
    fn logged_out_controller_is_inert() {
        let mut f = fixture();
        f.controller.start();
        drive_until(&mut f.controller, &f.timers, &f.clock, 1_200_000).unwrap();
        assert_eq!(f.controller.state(), SessionState::LoggedOut);

        f.controller.start();
        for trigger in [
            Trigger::Activity { at_ms: 1_200_001 },
            Trigger::Tick,
            Trigger::CancelRequested,
            Trigger::LogoutTimerFired {
                deadline_ms: 1_200_000,
            },
        ] {
            assert_eq!(f.controller.handle(trigger).unwrap(), None);
        }
        assert_eq!(f.controller.deadline_ms(), 1_200_000);
        assert_eq!(f.timers.pending_count(), 0);
        assert_eq!(f.logouts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_logout_is_surfaced_and_still_terminal() {
        let clock = ManualClock::new(0);
        let timers = VirtualScheduler::new(clock.clone());
        let store = MemoryStore::new();
        let mut controller = IdleSessionController::new(
            &config(60, 10),
            SessionParts {
                clock: Arc::new(clock.clone()),
                store: Box::new(store.clone()),
                timers: Box::new(timers.clone()),
                logout: Box::new(|| -> Result<(), LogoutError> {
                    Err(LogoutError::new("redirect blocked"))
                }),
            },
        )
        .unwrap();
        controller.start();

        let err = drive_until(&mut controller, &timers, &clock, 60_000).unwrap_err();
        assert!(matches!(err, CoreError::Logout(_)));
        assert_eq!(controller.state(), SessionState::LoggedOut);
        assert_eq!(timers.pending_count(), 0);
        assert_eq!(store.read(KEY).unwrap().as_deref(), Some("60000"));
    }

    #[test]
    fn unavailable_store_degrades_to_local_timeout() {
        let store = MemoryStore::new();
        store.set_available(false);
        let mut f = fixture_with(&config(1200, 30), store);
        f.controller.start();
        assert!(f.controller.is_degraded());

        let events = drive_until(&mut f.controller, &f.timers, &f.clock, 1_200_000).unwrap();
        assert!(matches!(
            events.first(),
            Some(SessionEvent::CountdownStarted { .. })
        ));
        assert!(matches!(events.last(), Some(SessionEvent::LoggedOut { .. })));
        assert_eq!(f.logouts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn store_recovery_clears_degraded_flag() {
        let store = MemoryStore::new();
        store.set_available(false);
        let mut f = fixture_with(&config(1200, 30), store);
        f.controller.start();
        assert!(f.controller.is_degraded());

        f.store.set_available(true);
        f.controller
            .handle(Trigger::Activity { at_ms: 1_000 })
            .unwrap();
        assert!(!f.controller.is_degraded());
        assert_eq!(shared(&f.store).as_deref(), Some("1201000"));
    }

    #[test]
    fn stop_withdraws_countdown_and_restart_reanchors() {
        let mut f = fixture();
        f.controller.start();
        drive_until(&mut f.controller, &f.timers, &f.clock, 1_175_000).unwrap();

        let event = f.controller.stop();
        assert!(matches!(
            event,
            Some(SessionEvent::CountdownCancelled {
                reason: CancelReason::Stopped,
                ..
            })
        ));
        assert_eq!(f.timers.pending_count(), 0);
        assert_eq!(f.controller.handle(Trigger::Tick).unwrap(), None);

        f.clock.set(2_000_000);
        f.controller.start();
        assert_eq!(f.controller.deadline_ms(), 3_200_000);
        assert_eq!(f.timers.pending_count(), 2);
    }

    #[test]
    fn snapshot_reports_current_state() {
        let mut f = fixture();
        f.controller.start();
        f.clock.set(200_000);
        match f.controller.snapshot() {
            SessionEvent::StateSnapshot {
                state,
                deadline_ms,
                countdown_starts_at_ms,
                seconds_remaining,
                degraded,
                ..
            } => {
                assert_eq!(state, SessionState::Idle);
                assert_eq!(deadline_ms, 1_200_000);
                assert_eq!(countdown_starts_at_ms, 1_170_000);
                assert_eq!(seconds_remaining, 1_000);
                assert!(!degraded);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }

    #[test]
    fn seconds_remaining_rounds_up() {
        let mut f = fixture();
        f.controller.start();
        f.clock.set(1_199_001);
        assert_eq!(f.controller.seconds_remaining(), 1);
        f.clock.set(1_250_000);
        assert_eq!(f.controller.seconds_remaining(), 0);
    }
}
