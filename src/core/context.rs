//! # Job context.
//!
//! Provides [`JobContext`], the explicit bundle of collaborators a job
//! receives instead of reaching for process-wide state: its straps, the
//! session pool, and the two shutdown primitives.
//!
//! ## Shutdown primitives
//! - [`ShutdownFlag`] - level-triggered, for poll-style loops
//!   (`while !ctx.is_shutdown() { ... }`)
//! - [`CancellationToken`] - edge-triggered, for select-style code
//!   (`tokio::select! { _ = ctx.cancelled() => ... }`)
//!
//! Both fire together when the supervisor starts a shutdown; a job picks
//! whichever style fits its loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::sessions::SessionPool;
use crate::straps::Straps;

/// Write-once shutdown indicator shared across a run.
///
/// Starts lowered; [`request`](ShutdownFlag::request) raises it and nothing
/// lowers it again. Cheap to clone and to poll.
#[derive(Clone, Debug, Default)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Creates a lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Idempotent.
    pub(crate) fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// True once shutdown has been requested.
    #[inline]
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Everything a job needs for one run.
///
/// Cheap to clone; clones observe the same shutdown state and session pool.
#[derive(Clone)]
pub struct JobContext {
    straps: Arc<Straps>,
    sessions: SessionPool,
    shutdown: ShutdownFlag,
    cancel: CancellationToken,
}

impl JobContext {
    pub(crate) fn new(
        straps: Arc<Straps>,
        sessions: SessionPool,
        shutdown: ShutdownFlag,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            straps,
            sessions,
            shutdown,
            cancel,
        }
    }

    /// The run's loaded straps.
    pub fn straps(&self) -> &Straps {
        &self.straps
    }

    /// The run's session pool.
    pub fn sessions(&self) -> &SessionPool {
        &self.sessions
    }

    /// True once the supervisor has started a shutdown.
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_requested()
    }

    /// Completes when the supervisor starts a shutdown.
    ///
    /// Suitable for `tokio::select!` arms alongside the job's own work.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// The run's cancel token, for handing to sub-tasks.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
