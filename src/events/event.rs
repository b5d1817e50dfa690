//! # Runtime events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Job lifecycle**: launch, completion, failure, caught panic.
//! - **Race outcomes**: timeout hit, shutdown requested, grace exceeded.
//! - **Teardown**: close completed or close failed.
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! job name, failure reasons, and the timeout/grace durations involved.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use jobvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TimeoutHit)
//!     .with_job("nightly-import")
//!     .with_timeout(Duration::from_secs(300));
//!
//! assert_eq!(ev.kind, EventKind::TimeoutHit);
//! assert_eq!(ev.job.as_deref(), Some("nightly-import"));
//! assert!(ev.is_alert());
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Job lifecycle events ===
    /// The user job was launched as the run's single background activity.
    ///
    /// Sets:
    /// - `job`: job name
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    JobStarting,

    /// The job ran to completion and reported success.
    ///
    /// Sets:
    /// - `job`: job name
    /// - `reason`: only when the job stopped on a shutdown request
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    JobCompleted,

    /// The job ran to completion and reported a failure.
    ///
    /// Sets:
    /// - `job`: job name
    /// - `reason`: failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    JobFailed,

    /// The job panicked; the fault was caught at the join boundary.
    ///
    /// Sets:
    /// - `job`: job name
    /// - `reason`: panic payload, best effort
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    JobPanicked,

    // === Race outcomes ===
    /// The hard run timeout fired before the job completed; the job was aborted.
    ///
    /// Sets:
    /// - `job`: job name
    /// - `timeout_ms`: configured run timeout (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TimeoutHit,

    /// Shutdown requested (OS termination signal observed).
    ///
    /// Sets:
    /// - `job`: job name
    /// - `grace_ms`: grace period the job now has (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ShutdownRequested,

    /// Grace period lapsed after a shutdown request; the job was aborted.
    ///
    /// Sets:
    /// - `job`: job name
    /// - `grace_ms`: configured grace period (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    GraceExceeded,

    // === Teardown ===
    /// Teardown finished; session pool resources were released.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    RunClosed,

    /// Teardown hit an error or caught a panic; remaining steps still ran.
    ///
    /// Sets:
    /// - `reason`: teardown failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    CloseFailed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Run timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Shutdown grace period in milliseconds (compact).
    pub grace_ms: Option<u32>,
    /// Human-readable reason (errors, panic payloads, teardown details).
    pub reason: Option<Arc<str>>,
    /// Name of the job, if applicable.
    pub job: Option<Arc<str>>,
    /// Event classification.
    pub kind: EventKind,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            at: SystemTime::now(),
            timeout_ms: None,
            grace_ms: None,
            reason: None,
            job: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a job name.
    #[inline]
    pub fn with_job(mut self, job: impl Into<Arc<str>>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Attaches the run timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches the grace period (stored as milliseconds).
    #[inline]
    pub fn with_grace(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.grace_ms = Some(ms);
        self
    }

    /// Whether the event is alert-class: it reaches the notification
    /// collaborator in addition to the log.
    ///
    /// Alert-class events are terminal faults (failure, panic, timeout,
    /// grace expiry) and broken teardown. [`EventKind::ShutdownRequested`]
    /// is a notice, not an alert, but is mailed as well.
    #[inline]
    pub fn is_alert(&self) -> bool {
        matches!(
            self.kind,
            EventKind::JobFailed
                | EventKind::JobPanicked
                | EventKind::TimeoutHit
                | EventKind::GraceExceeded
                | EventKind::CloseFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::JobStarting);
        let b = Event::new(EventKind::JobCompleted);
        assert!(b.seq > a.seq, "expected {} > {}", b.seq, a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::new(EventKind::GraceExceeded)
            .with_job("worker")
            .with_reason("stuck")
            .with_grace(Duration::from_secs(30));
        assert_eq!(ev.job.as_deref(), Some("worker"));
        assert_eq!(ev.reason.as_deref(), Some("stuck"));
        assert_eq!(ev.grace_ms, Some(30_000));
        assert_eq!(ev.timeout_ms, None);
    }

    #[test]
    fn test_alert_classification() {
        for kind in [
            EventKind::JobFailed,
            EventKind::JobPanicked,
            EventKind::TimeoutHit,
            EventKind::GraceExceeded,
            EventKind::CloseFailed,
        ] {
            assert!(Event::new(kind).is_alert(), "{kind:?} should alert");
        }
        for kind in [
            EventKind::JobStarting,
            EventKind::JobCompleted,
            EventKind::ShutdownRequested,
            EventKind::RunClosed,
        ] {
            assert!(!Event::new(kind).is_alert(), "{kind:?} should not alert");
        }
    }
}
