//! # Idle Logout Core Library
//!
//! Logs a user out after a period of inactivity, consistently across every
//! open context (tab, window, process) of the same session. Contexts never
//! talk to each other directly; they share one last-write-wins deadline
//! record and reconcile against it whenever a timer fires.
//!
//! ## Architecture
//!
//! - **Session controller**: a three-state machine (Idle, CountingDown,
//!   LoggedOut) driven by one exhaustive transition function
//! - **Shared store**: a key/value register with cookie-path scoping, backed
//!   by memory or by files on disk
//! - **Timers**: a tokio task scheduler for real use and a virtual-time
//!   scheduler for deterministic tests and simulations
//! - **Runtime**: a tokio event loop that feeds timer firings and input
//!   events to the controller and forwards the events it emits
//!
//! ## Key Components
//!
//! - [`IdleSessionController`]: deadline ownership and reconciliation
//! - [`SharedStore`]: the cross-context register
//! - [`IdleLogoutConfig`]: TOML configuration and validation
//! - [`SessionRuntime`]: async driver for one context

pub mod activity;
pub mod clock;
pub mod error;
pub mod events;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod timer;

pub use activity::ActivityBridge;
pub use clock::{Clock, ManualClock, RuntimeClock, SystemClock};
pub use error::{ConfigError, CoreError, LogoutError, StoreError};
pub use events::{CancelReason, SessionEvent};
pub use runtime::{SessionCommand, SessionHandle, SessionRuntime};
pub use session::{
    IdleSessionController, LogoutAction, SessionParts, SessionState, SessionTiming, Trigger,
};
pub use storage::{
    ActivityConfig, FileStore, IdleLogoutConfig, MemoryStore, SharedDeadlineStore, SharedStore,
    StoreConfig, WriteOptions,
};
pub use timer::{TimerScheduler, TimerTag, TokioScheduler, VirtualScheduler};
