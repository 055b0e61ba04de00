//! Drift detection between the local deadline and the shared record.

/// Outcome of comparing the local deadline with the shared one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drift {
    /// Same value on both sides.
    InSync,
    /// Another context saw more recent activity; adopt its deadline.
    SharedAhead(u64),
    /// Local deadline is newer than the shared one; overwrite the record.
    SharedBehind,
    /// No usable shared value; local is authoritative and should be written.
    SharedAbsent,
}

/// Classify a shared read against the local deadline.
///
/// Never assumes the shared value reflects this context's own last write.
pub fn classify_drift(local_ms: u64, shared_ms: Option<u64>) -> Drift {
    match shared_ms {
        None => Drift::SharedAbsent,
        Some(shared) if shared == local_ms => Drift::InSync,
        Some(shared) if shared > local_ms => Drift::SharedAhead(shared),
        Some(_) => Drift::SharedBehind,
    }
}
