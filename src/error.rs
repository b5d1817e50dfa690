//! Error types used by the jobvisor runtime and jobs.
//!
//! This module defines two main error enums:
//!
//! - [`RunError`]: errors raised by the supervising runtime itself.
//! - [`JobError`]: errors raised by the user job's execution.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging
//! and alert formatting. Collaborator-local errors ([`StrapError`],
//! [`SessionError`]) live next to their modules and convert into these two
//! at the phase boundaries.
//!
//! [`StrapError`]: crate::straps::StrapError
//! [`SessionError`]: crate::sessions::SessionError

use std::time::Duration;
use thiserror::Error;

use crate::sessions::SessionError;
use crate::straps::StrapError;

/// # Errors produced by the supervising runtime.
///
/// These represent failures of the run itself: configuration that could not
/// be loaded, the hard timeout firing, the shutdown grace period lapsing, or
/// a fault caught at the job boundary. Every variant resolves to a non-zero
/// process exit when raised during init or start.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunError {
    /// Configuration could not be loaded or was missing required keys.
    #[error("configuration: {0}")]
    Strap(#[from] StrapError),

    /// Logging collaborator could not be started.
    #[error("logging startup failed: {error}")]
    Logging {
        /// The underlying error message.
        error: String,
    },

    /// The run exceeded its hard timeout and the job was aborted.
    #[error("run timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Shutdown grace period was exceeded; the job remained stuck and was force-aborted.
    #[error("shutdown grace {grace:?} exceeded; job {job} forced to stop")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Name of the job that did not stop in time.
        job: String,
    },

    /// An unexpected fault was caught at the job boundary.
    #[error("job panicked: {message}")]
    Panicked {
        /// Payload of the caught fault, best effort.
        message: String,
    },

    /// Teardown reported a failure after the run outcome was decided.
    ///
    /// Raised only by the close phase; never changes the process exit
    /// status on its own.
    #[error("close failed: {reason}")]
    Close {
        /// What broke during teardown, best effort.
        reason: String,
    },

    /// The job ran to completion and reported a failure.
    #[error("job failed: {0}")]
    Job(#[from] JobError),
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs/alerts.
    ///
    /// # Example
    /// ```
    /// use jobvisor::RunError;
    /// use std::time::Duration;
    ///
    /// let err = RunError::Timeout { timeout: Duration::from_secs(5) };
    /// assert_eq!(err.as_label(), "run_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::Strap(_) => "run_configuration",
            RunError::Logging { .. } => "run_logging",
            RunError::Timeout { .. } => "run_timeout",
            RunError::GraceExceeded { .. } => "run_grace_exceeded",
            RunError::Panicked { .. } => "run_panicked",
            RunError::Close { .. } => "run_close_failed",
            RunError::Job(_) => "run_job_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RunError::Strap(e) => format!("configuration: {e}"),
            RunError::Logging { error } => format!("logging: {error}"),
            RunError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            RunError::GraceExceeded { grace, job } => {
                format!("grace exceeded after {grace:?}; stuck job={job}")
            }
            RunError::Panicked { message } => format!("panic: {message}"),
            RunError::Close { reason } => format!("close: {reason}"),
            RunError::Job(e) => e.as_message(),
        }
    }
}

/// # Errors produced by job execution.
///
/// These represent failures of the single user job supervised by the
/// runtime. Session and configuration errors raised while the job runs
/// convert into this type with `?`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum JobError {
    /// Job execution failed with an application-level error.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Job observed shutdown and stopped before completing its work.
    #[error("cancelled before completion")]
    Canceled,

    /// A session pool operation failed while the job was running.
    #[error("session: {0}")]
    Session(#[from] SessionError),

    /// Additional configuration the job loaded itself was invalid.
    #[error("configuration: {0}")]
    Strap(#[from] StrapError),
}

impl JobError {
    /// Builds a [`JobError::Fail`] from any displayable error.
    pub fn fail(error: impl std::fmt::Display) -> Self {
        JobError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/alerts.
    ///
    /// # Example
    /// ```
    /// use jobvisor::JobError;
    ///
    /// let err = JobError::Canceled;
    /// assert_eq!(err.as_label(), "job_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Canceled => "job_canceled",
            JobError::Session(_) => "job_session",
            JobError::Strap(_) => "job_configuration",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            JobError::Fail { error } => format!("error: {error}"),
            JobError::Canceled => "cancelled before completion".to_string(),
            JobError::Session(e) => e.as_message(),
            JobError::Strap(e) => format!("configuration: {e}"),
        }
    }
}
