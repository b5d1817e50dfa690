//! # Launch a single job execution.
//!
//! Spawns the job onto the runtime so the supervisor can race its
//! completion against the interrupt and timeout arms. The spawned task is
//! the run's one panic boundary: a panicking job surfaces as a
//! [`JoinError`](tokio::task::JoinError) with `is_panic()`, never as an
//! unwind through the supervisor.

use std::any::Any;

use tokio::task::JoinHandle;

use crate::error::JobError;
use crate::jobs::JobRef;

use super::context::JobContext;

/// Spawns one execution of `job` with its context.
///
/// The caller owns the handle; aborting it is how the supervisor enforces
/// its deadlines.
pub(crate) fn launch(job: JobRef, ctx: JobContext) -> JoinHandle<Result<(), JobError>> {
    tokio::spawn(async move {
        tracing::debug!(job = job.name(), "job launched");
        let result = job.run(ctx).await;
        match &result {
            Ok(()) => tracing::debug!(job = job.name(), "job finished"),
            Err(err) => tracing::debug!(job = job.name(), error = %err, "job returned error"),
        }
        result
    })
}

/// Renders a caught panic payload, best effort.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
