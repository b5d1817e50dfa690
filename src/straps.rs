//! # Strap configuration collaborator.
//!
//! Flat key/value configuration loaded from a TOML file. The file location
//! is never hard-coded: a job declares an `(environment variable, directory)`
//! pair, the variable's value names the deployment environment, and the
//! loaded file is `<directory>/<environment>.toml`. An unset variable is a
//! deployment misconfiguration and fails the load outright.
//!
//! ## Recognized keys
//! | Key | Type | Consumed by |
//! |---|---|---|
//! | `machine_name` | string | logging, alert subjects |
//! | `console_log_only` | bool | logging (skip file output and mail) |
//! | `log_file_dir` | string | logging (dated file per day) |
//! | `log_days_to_keep` | integer | logging retention sweep |
//! | `run_timeout_seconds` | integer | supervisor hard timeout (0 = none) |
//! | `shutdown_grace_seconds` | integer | supervisor grace period |
//! | `mongo_hosts` | string (comma separated) | session pool |
//! | `mongo_database` | string | session pool |
//! | `mongo_username` / `mongo_password` | string | session pool |
//! | `mongo_connect_timeout_seconds` | integer | session pool (default 60) |
//! | `mongo_op_timeout_seconds` | integer | session pool (default 10) |
//! | `email_host` / `email_port` | string / integer | alert mailer |
//! | `email_username` / `email_password` | string | alert mailer |
//! | `email_to` / `email_alert_subject` | string | alert mailer |
//!
//! Unrecognized keys are kept and readable; jobs are free to define their
//! own straps in the same file.
//!
//! ## Example
//! ```
//! use jobvisor::Straps;
//!
//! let straps = Straps::from_toml_str(
//!     r#"
//!     machine_name = "batch-01"
//!     run_timeout_seconds = 300
//!     console_log_only = true
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(straps.strap("machine_name").unwrap(), "batch-01");
//! assert_eq!(straps.strap_int("run_timeout_seconds").unwrap(), 300);
//! assert!(straps.strap_bool("console_log_only").unwrap());
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while loading straps or reading individual keys.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StrapError {
    /// The declared environment variable is unset or empty.
    #[error("environment variable {var} is not set")]
    MissingEnv {
        /// Name of the variable the job declared.
        var: String,
    },

    /// The straps file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The straps file is not valid TOML.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// A required key is absent.
    #[error("strap {key} is not set")]
    MissingKey {
        /// The missing key.
        key: String,
    },

    /// A key is present with a different TOML type than requested.
    #[error("strap {key} is not a {expected}")]
    WrongType {
        /// The offending key.
        key: String,
        /// The TOML type the caller asked for.
        expected: &'static str,
    },

    /// A key parsed but its value is out of the accepted range.
    #[error("strap {key}: {detail}")]
    BadValue {
        /// The offending key.
        key: String,
        /// What was wrong with the value.
        detail: String,
    },
}

/// Loaded strap table. Cheap to share behind an `Arc`; all reads are by key.
#[derive(Debug, Clone)]
pub struct Straps {
    values: toml::Table,
}

impl Straps {
    /// Loads straps for the environment named by `env_var` from `dir`.
    ///
    /// Reads `std::env::var(env_var)` to pick the environment, then parses
    /// `<dir>/<environment>.toml`. An unset or empty variable fails with
    /// [`StrapError::MissingEnv`] before any file I/O happens.
    pub fn load(env_var: &str, dir: impl AsRef<Path>) -> Result<Self, StrapError> {
        let environment = match std::env::var(env_var) {
            Ok(v) if !v.trim().is_empty() => v,
            _ => {
                return Err(StrapError::MissingEnv {
                    var: env_var.to_string(),
                })
            }
        };

        let path = dir.as_ref().join(format!("{environment}.toml"));
        let text = std::fs::read_to_string(&path).map_err(|source| StrapError::Read {
            path: path.clone(),
            source,
        })?;
        let straps = Self::parse(&text, &path)?;

        tracing::debug!(
            environment,
            path = %path.display(),
            keys = straps.values.len(),
            "straps loaded"
        );
        Ok(straps)
    }

    /// Builds straps directly from TOML text. Useful for embedders and tests.
    pub fn from_toml_str(text: &str) -> Result<Self, StrapError> {
        Self::parse(text, Path::new("<inline>"))
    }

    /// Builds straps from an already-parsed table.
    pub fn from_table(values: toml::Table) -> Self {
        Self { values }
    }

    fn parse(text: &str, path: &Path) -> Result<Self, StrapError> {
        let values: toml::Table = toml::from_str(text).map_err(|source| StrapError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { values })
    }

    /// Returns the string strap under `key`.
    pub fn strap(&self, key: &str) -> Result<&str, StrapError> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| StrapError::WrongType {
            key: key.to_string(),
            expected: "string",
        })
    }

    /// Returns the integer strap under `key`.
    pub fn strap_int(&self, key: &str) -> Result<i64, StrapError> {
        let value = self.require(key)?;
        value.as_integer().ok_or_else(|| StrapError::WrongType {
            key: key.to_string(),
            expected: "integer",
        })
    }

    /// Returns the boolean strap under `key`.
    pub fn strap_bool(&self, key: &str) -> Result<bool, StrapError> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| StrapError::WrongType {
            key: key.to_string(),
            expected: "boolean",
        })
    }

    /// Returns the string strap under `key`, or `None` when absent or mistyped.
    pub fn opt_strap(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    /// Returns the integer strap under `key`, or `None` when absent or mistyped.
    pub fn opt_strap_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(|v| v.as_integer())
    }

    /// Returns the boolean strap under `key`, or `None` when absent or mistyped.
    pub fn opt_strap_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(|v| v.as_bool())
    }

    /// Reads an integer seconds strap into a [`Duration`](std::time::Duration).
    ///
    /// Negative values are rejected with [`StrapError::BadValue`].
    pub fn strap_secs(&self, key: &str) -> Result<std::time::Duration, StrapError> {
        let raw = self.strap_int(key)?;
        let secs = u64::try_from(raw).map_err(|_| StrapError::BadValue {
            key: key.to_string(),
            detail: format!("negative seconds value {raw}"),
        })?;
        Ok(std::time::Duration::from_secs(secs))
    }

    /// Like [`Straps::strap_secs`], but an absent key is `Ok(None)` rather
    /// than an error. A present key must still hold a non-negative integer.
    pub fn opt_strap_secs(&self, key: &str) -> Result<Option<std::time::Duration>, StrapError> {
        if self.values.contains_key(key) {
            self.strap_secs(key).map(Some)
        } else {
            Ok(None)
        }
    }

    fn require(&self, key: &str) -> Result<&toml::Value, StrapError> {
        self.values.get(key).ok_or_else(|| StrapError::MissingKey {
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Straps {
        Straps::from_toml_str(
            r#"
            machine_name = "batch-01"
            run_timeout_seconds = 300
            console_log_only = false
            mongo_hosts = "db1:27017,db2:27017"
            bad_seconds = -5
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_strap_reads_string() {
        let s = sample();
        assert_eq!(s.strap("machine_name").unwrap(), "batch-01");
        assert_eq!(s.strap("mongo_hosts").unwrap(), "db1:27017,db2:27017");
    }

    #[test]
    fn test_strap_int_and_bool() {
        let s = sample();
        assert_eq!(s.strap_int("run_timeout_seconds").unwrap(), 300);
        assert!(!s.strap_bool("console_log_only").unwrap());
    }

    #[test]
    fn test_missing_key_is_reported() {
        let s = sample();
        let err = s.strap("nope").unwrap_err();
        assert!(matches!(err, StrapError::MissingKey { key } if key == "nope"));
    }

    #[test]
    fn test_wrong_type_is_reported() {
        let s = sample();
        let err = s.strap("run_timeout_seconds").unwrap_err();
        assert!(matches!(err, StrapError::WrongType { expected: "string", .. }));
    }

    #[test]
    fn test_opt_variants_return_none() {
        let s = sample();
        assert_eq!(s.opt_strap("nope"), None);
        assert_eq!(s.opt_strap_int("machine_name"), None);
        assert_eq!(s.opt_strap_bool("nope"), None);
        assert_eq!(s.opt_strap_int("run_timeout_seconds"), Some(300));
    }

    #[test]
    fn test_strap_secs_rejects_negative() {
        let s = sample();
        assert_eq!(
            s.strap_secs("run_timeout_seconds").unwrap(),
            std::time::Duration::from_secs(300)
        );
        assert!(matches!(
            s.strap_secs("bad_seconds"),
            Err(StrapError::BadValue { .. })
        ));
    }

    #[test]
    fn test_load_fails_without_environment_variable() {
        let err = Straps::load("JOBVISOR_TEST_UNSET_VAR", "/tmp").unwrap_err();
        assert!(matches!(err, StrapError::MissingEnv { var } if var == "JOBVISOR_TEST_UNSET_VAR"));
    }

    #[test]
    fn test_load_reads_environment_named_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("staging.toml"),
            "machine_name = \"stage-07\"\n",
        )
        .unwrap();

        std::env::set_var("JOBVISOR_TEST_STRAPS_ENV", "staging");
        let straps = Straps::load("JOBVISOR_TEST_STRAPS_ENV", dir.path()).unwrap();
        std::env::remove_var("JOBVISOR_TEST_STRAPS_ENV");

        assert_eq!(straps.strap("machine_name").unwrap(), "stage-07");
    }

    #[test]
    fn test_load_reports_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not == toml").unwrap();

        std::env::set_var("JOBVISOR_TEST_STRAPS_BROKEN", "broken");
        let err = Straps::load("JOBVISOR_TEST_STRAPS_BROKEN", dir.path()).unwrap_err();
        std::env::remove_var("JOBVISOR_TEST_STRAPS_BROKEN");

        assert!(matches!(err, StrapError::Parse { .. }));
    }
}
