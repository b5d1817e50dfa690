//! # Job abstraction.
//!
//! This module defines the [`Job`] trait (async, cancelable) plus
//! [`ConfigSource`], which tells the supervisor where the job's straps live.
//! The common handle type is [`JobRef`], an `Arc<dyn Job>` suitable for
//! handing to the supervisor.
//!
//! A job receives a [`JobContext`] and should periodically check its
//! shutdown flag (or await its cancel token) to stop cooperatively when an
//! interrupt arrives.

use std::borrow::Cow;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::core::JobContext;
use crate::error::JobError;

/// Where a job's straps come from: an environment variable naming the
/// active environment, and the directory holding `<environment>.toml`.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Environment variable that names the environment (e.g. `production`).
    pub env_var: Cow<'static, str>,
    /// Directory searched for `<environment>.toml`.
    pub dir: PathBuf,
}

impl ConfigSource {
    /// Source reading `env_var` and searching `dir`.
    pub fn new(env_var: impl Into<Cow<'static, str>>, dir: impl Into<PathBuf>) -> Self {
        Self {
            env_var: env_var.into(),
            dir: dir.into(),
        }
    }
}

impl Default for ConfigSource {
    /// `JOBVISOR_ENV` resolved against a local `config/` directory.
    fn default() -> Self {
        Self::new("JOBVISOR_ENV", "config")
    }
}

/// # Asynchronous, cancelable unit of work.
///
/// A `Job` has a stable [`name`](Job::name), a [`config_source`](Job::config_source)
/// the supervisor loads straps from before the job runs, and an async
/// [`run`](Job::run) method that receives a [`JobContext`]. Implementors
/// should regularly check `ctx.is_shutdown()` (or select on
/// `ctx.cancelled()`) and exit promptly when an interrupt arrives.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use jobvisor::{Job, JobContext, JobError};
///
/// struct Demo;
///
/// #[async_trait]
/// impl Job for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     async fn run(&self, ctx: JobContext) -> Result<(), JobError> {
///         if ctx.is_shutdown() {
///             return Ok(());
///         }
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Returns a stable, human-readable job name.
    fn name(&self) -> &str;

    /// Returns where the supervisor finds this job's straps.
    ///
    /// The default reads `JOBVISOR_ENV` and searches `config/`.
    fn config_source(&self) -> ConfigSource {
        ConfigSource::default()
    }

    /// Executes the job until completion or cooperative shutdown.
    ///
    /// Implementations should check `ctx.is_shutdown()` and wind down
    /// quickly to stay inside the grace period.
    async fn run(&self, ctx: JobContext) -> Result<(), JobError>;
}
