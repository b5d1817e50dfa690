//! # Run configuration.
//!
//! Provides [`RunConfig`], the per-run settings the supervisor loads from
//! straps during its init phase.
//!
//! ## Sentinel values
//! - `run_timeout = 0s` → no deadline (treated as `None` by [`RunConfig::run_timeout`])
//! - `days_to_keep = 0` → keep log files forever
//! - `grace = 0s` → no wait, force immediately on interrupt

use std::path::PathBuf;
use std::time::Duration;

use crate::straps::{StrapError, Straps};
use crate::subscribers::MailSettings;

/// Grace period used when `shutdown_grace_seconds` is not strapped.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(30);

/// Log retention used when `log_days_to_keep` is not strapped.
pub const DEFAULT_LOG_KEEP_DAYS: u32 = 7;

/// Per-run settings for the supervisor.
///
/// Defines:
/// - **Identity**: machine name stamped into logs and alert mail
/// - **Logging**: console-only vs dated files with retention
/// - **Deadlines**: overall run timeout and shutdown grace period
/// - **Alerting**: optional SMTP settings for failure mail
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to
/// avoid sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Machine name recorded in log lines, log file names, and alert mail.
    pub machine: String,

    /// When true, log to stdout only and never touch the filesystem.
    pub console_only: bool,

    /// Directory for dated log files. `None` in console-only mode.
    pub log_dir: Option<PathBuf>,

    /// Days a dated log file survives before startup pruning removes it.
    ///
    /// - `0` = keep forever
    /// - `n > 0` = files older than `n` days are deleted at startup
    pub days_to_keep: u32,

    /// Overall deadline for the run phase.
    ///
    /// - `Duration::ZERO` = no deadline
    /// - `> 0` = the run is forcibly ended when the deadline lapses
    pub run_timeout: Duration,

    /// Maximum wait for the job to stop after an interrupt.
    ///
    /// When an OS interrupt arrives:
    /// - The shutdown flag is raised and the cancel token fires
    /// - The supervisor waits up to `grace` for the job to exit
    /// - A lapsed grace aborts the job and fails the run
    pub grace: Duration,

    /// SMTP alerting; `None` disables mail entirely.
    pub mail: Option<MailSettings>,
}

impl RunConfig {
    /// Loads the run configuration from straps.
    ///
    /// Required keys: `machine_name`, `console_log_only`, and `log_file_dir`
    /// unless console-only. Optional keys fall back to the documented
    /// defaults.
    pub fn from_straps(straps: &Straps) -> Result<Self, StrapError> {
        let machine = straps.strap("machine_name")?.to_string();
        let console_only = straps.strap_bool("console_log_only")?;

        let log_dir = if console_only {
            None
        } else {
            Some(PathBuf::from(straps.strap("log_file_dir")?))
        };

        let days = straps
            .opt_strap_int("log_days_to_keep")
            .unwrap_or(i64::from(DEFAULT_LOG_KEEP_DAYS));
        let days_to_keep = u32::try_from(days).map_err(|_| StrapError::BadValue {
            key: "log_days_to_keep".to_string(),
            detail: format!("{days} is not a valid day count"),
        })?;

        let run_timeout = straps
            .opt_strap_secs("run_timeout_seconds")?
            .unwrap_or(Duration::ZERO);
        let grace = straps
            .opt_strap_secs("shutdown_grace_seconds")?
            .unwrap_or(DEFAULT_GRACE);

        Ok(Self {
            machine,
            console_only,
            log_dir,
            days_to_keep,
            run_timeout,
            grace,
            mail: MailSettings::from_straps(straps)?,
        })
    }

    /// Returns the run deadline as an `Option`.
    ///
    /// - `None` → no deadline
    /// - `Some(d)` → the run phase is bounded by `d`
    #[inline]
    pub fn run_timeout(&self) -> Option<Duration> {
        if self.run_timeout == Duration::ZERO {
            None
        } else {
            Some(self.run_timeout)
        }
    }

    /// Returns the log retention as an `Option`.
    ///
    /// - `None` → keep forever
    /// - `Some(n)` → prune files older than `n` days
    #[inline]
    pub fn log_keep_days(&self) -> Option<u32> {
        if self.days_to_keep == 0 {
            None
        } else {
            Some(self.days_to_keep)
        }
    }
}

impl Default for RunConfig {
    /// Default configuration:
    ///
    /// - `machine = "unknown"`
    /// - `console_only = true` (no filesystem access)
    /// - `days_to_keep = 7`
    /// - `run_timeout = 0s` (no deadline)
    /// - `grace = 30s`
    /// - `mail = None` (alerting disabled)
    fn default() -> Self {
        Self {
            machine: "unknown".to_string(),
            console_only: true,
            log_dir: None,
            days_to_keep: DEFAULT_LOG_KEEP_DAYS,
            run_timeout: Duration::ZERO,
            grace: DEFAULT_GRACE,
            mail: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straps(body: &str) -> Straps {
        Straps::from_toml_str(body).unwrap()
    }

    #[test]
    fn test_from_straps_console_only() {
        let cfg = RunConfig::from_straps(&straps(
            r#"
            machine_name = "worker-1"
            console_log_only = true
            "#,
        ))
        .unwrap();

        assert_eq!(cfg.machine, "worker-1");
        assert!(cfg.console_only);
        assert!(cfg.log_dir.is_none());
        assert_eq!(cfg.days_to_keep, DEFAULT_LOG_KEEP_DAYS);
        assert_eq!(cfg.run_timeout(), None);
        assert_eq!(cfg.grace, DEFAULT_GRACE);
        assert!(cfg.mail.is_none());
    }

    #[test]
    fn test_from_straps_file_logging_requires_dir() {
        let err = RunConfig::from_straps(&straps(
            r#"
            machine_name = "worker-1"
            console_log_only = false
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, StrapError::MissingKey { key } if key == "log_file_dir"));
    }

    #[test]
    fn test_from_straps_full() {
        let cfg = RunConfig::from_straps(&straps(
            r#"
            machine_name = "worker-1"
            console_log_only = false
            log_file_dir = "/var/log/jobs"
            log_days_to_keep = 3
            run_timeout_seconds = 120
            shutdown_grace_seconds = 5
            email_host = "smtp.example.com"
            email_to = "ops@example.com"
            "#,
        ))
        .unwrap();

        assert_eq!(cfg.log_dir.as_deref(), Some(std::path::Path::new("/var/log/jobs")));
        assert_eq!(cfg.log_keep_days(), Some(3));
        assert_eq!(cfg.run_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(cfg.grace, Duration::from_secs(5));
        assert!(cfg.mail.is_some());
    }

    #[test]
    fn test_zero_sentinels_map_to_none() {
        let cfg = RunConfig {
            run_timeout: Duration::ZERO,
            days_to_keep: 0,
            ..RunConfig::default()
        };
        assert_eq!(cfg.run_timeout(), None);
        assert_eq!(cfg.log_keep_days(), None);
    }

    #[test]
    fn test_negative_day_count_rejected() {
        let err = RunConfig::from_straps(&straps(
            r#"
            machine_name = "worker-1"
            console_log_only = true
            log_days_to_keep = -2
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, StrapError::BadValue { key, .. } if key == "log_days_to_keep"));
    }
}
