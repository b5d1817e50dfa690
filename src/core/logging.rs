//! # Log collaborator startup.
//!
//! Installs the global `tracing` subscriber for a run. Two modes, chosen by
//! [`RunConfig::console_only`]:
//!
//! - **console-only**: one stdout layer, nothing touches the filesystem
//! - **file**: stdout plus an append-mode dated file
//!   `<machine>-<YYYY-MM-DD>.log` under [`RunConfig::log_dir`], with files
//!   past the retention window pruned at startup
//!
//! `RUST_LOG` overrides the filter; without it the level is `info`.
//!
//! Startup is idempotent: if a subscriber is already installed (tests,
//! embedders) the call leaves it in place and reports success.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::RunError;

use super::config::RunConfig;

/// Installs the global subscriber per the run configuration.
///
/// In file mode the log directory is created if absent and stale dated
/// files are pruned per [`RunConfig::log_keep_days`]. Prune failures are
/// logged, never fatal; only an unusable directory or file fails startup.
pub fn startup(cfg: &RunConfig) -> Result<(), RunError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let dir = match (cfg.console_only, cfg.log_dir.as_deref()) {
        (false, Some(dir)) => dir,
        _ => {
            // A failed try_init means a subscriber is already installed.
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init();
            return Ok(());
        }
    };

    std::fs::create_dir_all(dir).map_err(|err| RunError::Logging {
        error: format!("create log dir {}: {err}", dir.display()),
    })?;

    let name = log_file_name(&cfg.machine, chrono::Utc::now().date_naive());
    let path = dir.join(&name);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| RunError::Logging {
            error: format!("open log file {}: {err}", path.display()),
        })?;

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .try_init();

    if let Some(days) = cfg.log_keep_days() {
        match prune_old_logs(dir, days) {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "stale log files pruned"),
            Err(err) => tracing::warn!(error = %err, "log prune failed"),
        }
    }

    tracing::debug!(file = %path.display(), "file logging started");
    Ok(())
}

/// Removes dated log files older than `days` days and returns how many.
///
/// Only files matching the `<anything>-<YYYY-MM-DD>.log` shape are
/// considered; everything else in the directory is left alone. A file that
/// cannot be removed is logged and skipped.
pub fn prune_old_logs(dir: &Path, days: u32) -> std::io::Result<usize> {
    let cutoff = chrono::Utc::now().date_naive() - chrono::Duration::days(i64::from(days));
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(date) = file_date(&name.to_string_lossy()) else {
            continue;
        };
        if date >= cutoff {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(err) => {
                tracing::warn!(file = %entry.path().display(), error = %err, "log prune skip")
            }
        }
    }
    Ok(removed)
}

/// `<machine>-<YYYY-MM-DD>.log`
fn log_file_name(machine: &str, date: NaiveDate) -> String {
    format!("{machine}-{date}.log")
}

/// Parses the date out of a dated log file name, `None` for anything else.
fn file_date(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_suffix(".log")?;
    // The date is the last 10 bytes; a cut inside a multibyte character
    // means the stem cannot end in an ASCII date.
    if stem.len() < 11 || !stem.is_char_boundary(stem.len() - 10) {
        return None;
    }
    let (prefix, date) = stem.split_at(stem.len() - 10);
    if !prefix.ends_with('-') {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(log_file_name("worker-1", date), "worker-1-2024-03-07.log");
    }

    #[test]
    fn test_file_date_accepts_only_dated_logs() {
        assert_eq!(
            file_date("worker-1-2024-03-07.log"),
            NaiveDate::from_ymd_opt(2024, 3, 7)
        );
        assert_eq!(file_date("worker-1-2024-03-07.txt"), None);
        assert_eq!(file_date("2024-03-07.log"), None);
        assert_eq!(file_date("worker-1-2024-13-07.log"), None);
        assert_eq!(file_date("notes.log"), None);
    }

    #[test]
    fn test_file_date_handles_multibyte_names() {
        // Multibyte in the prefix is fine; the date bytes are still ASCII.
        assert_eq!(
            file_date("wörker-2024-03-07.log"),
            NaiveDate::from_ymd_opt(2024, 3, 7)
        );
        // Eleven bytes of stem, but the date cut lands inside 'é'.
        assert_eq!(file_date("éa23456789.log"), None);
        assert_eq!(file_date("日誌-2024-03-07.log"), NaiveDate::from_ymd_opt(2024, 3, 7));
    }

    #[test]
    fn test_prune_removes_only_stale_dated_logs() {
        let dir = tempfile::tempdir().unwrap();
        let today = chrono::Utc::now().date_naive();

        let stale = dir.path().join(log_file_name("m", today - chrono::Duration::days(30)));
        let fresh = dir.path().join(log_file_name("m", today));
        let other = dir.path().join("notes.txt");
        std::fs::write(&stale, b"old").unwrap();
        std::fs::write(&fresh, b"new").unwrap();
        std::fs::write(&other, b"keep").unwrap();

        let removed = prune_old_logs(dir.path(), 7).unwrap();
        assert_eq!(removed, 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
        assert!(other.exists());
    }

    #[test]
    fn test_prune_skips_unicode_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join("éa23456789.log");
        std::fs::write(&odd, b"keep").unwrap();

        let removed = prune_old_logs(dir.path(), 7).unwrap();
        assert_eq!(removed, 0);
        assert!(odd.exists());
    }

    #[test]
    fn test_startup_console_only_is_idempotent() {
        let cfg = RunConfig::default();
        assert!(startup(&cfg).is_ok());
        // A second call finds a subscriber installed and still succeeds.
        assert!(startup(&cfg).is_ok());
    }

    #[test]
    fn test_startup_file_mode_creates_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            machine: "test-rig".to_string(),
            console_only: false,
            log_dir: Some(dir.path().join("logs")),
            ..RunConfig::default()
        };

        startup(&cfg).unwrap();

        let expected = dir
            .path()
            .join("logs")
            .join(log_file_name("test-rig", chrono::Utc::now().date_naive()));
        assert!(expected.exists());
    }
}
