//! # Function-backed job (`JobFn`)
//!
//! [`JobFn`] wraps a closure `F: Fn(JobContext) -> Fut`, producing a fresh
//! future per run. This avoids shared mutable state and needs no `Mutex`.
//!
//! ## Example
//! ```rust
//! use jobvisor::{JobContext, JobError, JobFn, JobRef};
//!
//! let job: JobRef = JobFn::arc("worker", |ctx: JobContext| async move {
//!     if ctx.is_shutdown() {
//!         return Ok(());
//!     }
//!     // do work...
//!     Ok::<_, JobError>(())
//! });
//!
//! assert_eq!(job.name(), "worker");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::JobContext;
use crate::error::JobError;

use super::job::{ConfigSource, Job};

/// Shared reference to a job (`Arc<dyn Job>`).
pub type JobRef = Arc<dyn Job>;

/// Function-backed job implementation.
///
/// Wraps a closure that *creates* a new future per run.
pub struct JobFn<F> {
    name: Cow<'static, str>,
    source: ConfigSource,
    f: F,
}

impl<F> JobFn<F> {
    /// Creates a new function-backed job with the default [`ConfigSource`].
    ///
    /// Prefer [`JobFn::arc`] when you immediately need a [`JobRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            source: ConfigSource::default(),
            f,
        }
    }

    /// Replaces where the supervisor looks for this job's straps.
    pub fn with_config_source(mut self, source: ConfigSource) -> Self {
        self.source = source;
        self
    }

    /// Creates the job and returns it as a shared handle (`Arc<dyn Job>`).
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Job for JobFn<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<(), JobError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn config_source(&self) -> ConfigSource {
        self.source.clone()
    }

    async fn run(&self, ctx: JobContext) -> Result<(), JobError> {
        (self.f)(ctx).await
    }
}
