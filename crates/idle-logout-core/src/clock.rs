//! Time sources.
//!
//! Every timestamp in the crate is milliseconds since the Unix epoch (`u64`).
//! Contexts never compare clocks directly; they only exchange absolute
//! deadlines through the shared store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        epoch_ms()
    }
}

/// Settable clock shared between clones.
///
/// Used with [`crate::timer::VirtualScheduler`] to run the state machine in
/// virtual time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Epoch time anchored once, then advanced by the tokio monotonic clock.
///
/// Immune to wall-clock jumps after construction and follows paused time in
/// `#[tokio::test(start_paused = true)]` tests.
#[derive(Debug, Clone)]
pub struct RuntimeClock {
    anchor_epoch_ms: u64,
    anchor: tokio::time::Instant,
}

impl RuntimeClock {
    pub fn new() -> Self {
        Self::anchored_at(epoch_ms())
    }

    pub fn anchored_at(anchor_epoch_ms: u64) -> Self {
        Self {
            anchor_epoch_ms,
            anchor: tokio::time::Instant::now(),
        }
    }
}

impl Default for RuntimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for RuntimeClock {
    fn now_ms(&self) -> u64 {
        let elapsed = self.anchor.elapsed().as_millis() as u64;
        self.anchor_epoch_ms.saturating_add(elapsed)
    }
}

fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
