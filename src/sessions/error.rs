//! Session pool error types.

use thiserror::Error;

use crate::straps::StrapError;

/// # Errors produced by the session pool.
///
/// Connect failures are retriable by the caller (re-registering under the
/// same name is a deliberate reconnect); a missing name is recoverable and
/// never alerts.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SessionError {
    /// Dial or authentication failed while building a session.
    #[error("session {name}: connect failed: {source}")]
    Connect {
        /// The session name being registered.
        name: String,
        /// Underlying driver error.
        source: mongodb::error::Error,
    },

    /// No session registered under the requested name.
    #[error("unable to locate session {name}")]
    NotFound {
        /// The name that was looked up.
        name: String,
    },

    /// Connection straps were missing or invalid.
    #[error("configuration: {0}")]
    Strap(#[from] StrapError),

    /// A database operation failed on an acquired handle.
    #[error("operation failed: {0}")]
    Op(#[from] mongodb::error::Error),
}

impl SessionError {
    /// Returns a short stable label (snake_case) for use in logs/alerts.
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionError::Connect { .. } => "session_connect",
            SessionError::NotFound { .. } => "session_not_found",
            SessionError::Strap(_) => "session_configuration",
            SessionError::Op(_) => "session_op",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SessionError::Connect { name, source } => {
                format!("connect failed for session {name}: {source}")
            }
            SessionError::NotFound { name } => format!("unable to locate session {name}"),
            SessionError::Strap(e) => format!("configuration: {e}"),
            SessionError::Op(e) => format!("operation failed: {e}"),
        }
    }

    /// Indicates whether the error type is safe to retry.
    ///
    /// Returns `true` for transient transport failures ([`SessionError::Connect`],
    /// [`SessionError::Op`]); `false` for lookup and configuration errors,
    /// which need a code or deployment fix first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Connect { .. } | SessionError::Op(_)
        )
    }
}
