mod scheduler;
mod tokio_scheduler;
mod virtual_time;

pub use scheduler::{TimerHandle, TimerKind, TimerScheduler, TimerTag};
pub use tokio_scheduler::TokioScheduler;
pub use virtual_time::{drive_until, FiredTimer, PendingTimer, VirtualScheduler};
