//! # Structured logging subscriber.
//!
//! [`LogWriter`] turns runtime events into `tracing` records: alert-class
//! events log at error level, the shutdown notice at warn, everything else
//! at info.
//!
//! ## Output shape
//! ```text
//! INFO  run: job starting job=nightly-import
//! WARN  run: shutdown requested
//! ERROR run: timeout hit job=nightly-import timeout_ms=300000
//! INFO  run: closed
//! ```
//!
//! ## Example
//! ```no_run
//! # use std::sync::Arc;
//! # use jobvisor::{LogWriter, Subscribe};
//! let subscriber: Arc<dyn Subscribe> = Arc::new(LogWriter);
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Logging subscriber backed by `tracing`.
///
/// Registered by the supervisor at init; lines carry the job name, reason,
/// and the timeout/grace values involved so the run is reconstructable from
/// the log alone.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let job = e.job.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::JobStarting => {
                tracing::info!(target: "run", job, seq = e.seq, "job starting");
            }
            EventKind::JobCompleted => {
                tracing::info!(target: "run", job, seq = e.seq, "job completed");
            }
            EventKind::JobFailed => {
                tracing::error!(
                    target: "run",
                    job,
                    reason = e.reason.as_deref().unwrap_or("-"),
                    seq = e.seq,
                    "job failed"
                );
            }
            EventKind::JobPanicked => {
                tracing::error!(
                    target: "run",
                    job,
                    reason = e.reason.as_deref().unwrap_or("-"),
                    seq = e.seq,
                    "job panicked"
                );
            }
            EventKind::TimeoutHit => {
                tracing::error!(
                    target: "run",
                    job,
                    timeout_ms = e.timeout_ms,
                    seq = e.seq,
                    "timeout hit; job aborted"
                );
            }
            EventKind::ShutdownRequested => {
                tracing::warn!(target: "run", seq = e.seq, "shutdown requested");
            }
            EventKind::GraceExceeded => {
                tracing::error!(
                    target: "run",
                    job,
                    grace_ms = e.grace_ms,
                    seq = e.seq,
                    "grace exceeded; job aborted"
                );
            }
            EventKind::RunClosed => {
                tracing::info!(target: "run", seq = e.seq, "closed");
            }
            EventKind::CloseFailed => {
                tracing::error!(
                    target: "run",
                    reason = e.reason.as_deref().unwrap_or("-"),
                    seq = e.seq,
                    "close failed; remaining teardown still ran"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
