//! # Dial settings for session connections.
//!
//! [`DialSettings`] groups everything needed to establish one master
//! connection: the ordered host list, target database, credential pair,
//! and the two timeout budgets. [`DialOverrides`] carries the per-handle
//! adjustments a detached acquisition may apply.
//!
//! ## Rules
//! - Timeouts default to seconds-scale budgets (60s connect, 10s per
//!   operation), never to "wait forever": a partitioned network must fail
//!   within budget instead of hanging the process.
//! - An empty username skips credentials entirely (unauthenticated
//!   deployments, typically local).
//!
//! ## Example
//! ```
//! use std::time::Duration;
//! use jobvisor::DialSettings;
//!
//! let dial = DialSettings::new(
//!     vec!["db1:27017".into(), "db2:27017".into()],
//!     "jobs",
//!     "runner",
//!     "secret",
//! )
//! .with_op_timeout(Duration::from_secs(5));
//!
//! assert_eq!(dial.connect_timeout, Duration::from_secs(60));
//! assert_eq!(dial.op_timeout, Duration::from_secs(5));
//! ```

use std::time::Duration;

use mongodb::options::{
    ClientOptions, Credential, ReadConcern, ReadPreference, SelectionCriteria, ServerAddress,
    WriteConcern,
};

use crate::straps::{StrapError, Straps};

/// Default dial/handshake budget.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default per-operation budget for acquired handles.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection parameters for one named session.
#[derive(Debug, Clone)]
pub struct DialSettings {
    /// Ordered `host:port` addresses for the replica set or single server.
    pub hosts: Vec<String>,
    /// Target database name; also the authentication source.
    pub database: String,
    /// Username; empty string means no credentials.
    pub username: String,
    /// Password paired with `username`.
    pub password: String,
    /// Budget for dialing and server selection.
    pub connect_timeout: Duration,
    /// Budget applied to individual operations on acquired handles.
    pub op_timeout: Duration,
}

impl DialSettings {
    /// Creates settings with the default timeout budgets.
    pub fn new(
        hosts: Vec<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            hosts,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    /// Replaces the dial/server-selection budget.
    pub fn with_connect_timeout(mut self, d: Duration) -> Self {
        self.connect_timeout = d;
        self
    }

    /// Replaces the per-operation budget.
    pub fn with_op_timeout(mut self, d: Duration) -> Self {
        self.op_timeout = d;
        self
    }

    /// Reads dial settings from straps.
    ///
    /// `mongo_hosts` is a comma-separated list; `mongo_database`,
    /// `mongo_username`, and `mongo_password` are required;
    /// `mongo_connect_timeout_seconds` and `mongo_op_timeout_seconds`
    /// override the defaults when present.
    pub fn from_straps(straps: &Straps) -> Result<Self, StrapError> {
        let raw_hosts = straps.strap("mongo_hosts")?;
        let hosts: Vec<String> = raw_hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();
        if hosts.is_empty() {
            return Err(StrapError::BadValue {
                key: "mongo_hosts".to_string(),
                detail: "no host addresses".to_string(),
            });
        }

        let mut dial = Self::new(
            hosts,
            straps.strap("mongo_database")?,
            straps.strap("mongo_username")?,
            straps.strap("mongo_password")?,
        );
        if let Some(d) = straps.opt_strap_secs("mongo_connect_timeout_seconds")? {
            dial.connect_timeout = d;
        }
        if let Some(d) = straps.opt_strap_secs("mongo_op_timeout_seconds")? {
            dial.op_timeout = d;
        }
        Ok(dial)
    }

    /// Returns a copy with the given overrides applied (detached acquisition).
    pub(crate) fn merged(&self, overrides: &DialOverrides) -> Self {
        let mut dial = self.clone();
        if let Some(d) = overrides.connect_timeout {
            dial.connect_timeout = d;
        }
        if let Some(d) = overrides.op_timeout {
            dial.op_timeout = d;
        }
        dial
    }

    /// Builds driver options: primary-only reads, majority read concern,
    /// journaled write acknowledgement, both dial phases bounded by
    /// `connect_timeout`.
    pub(crate) fn client_options(&self, app: &str) -> Result<ClientOptions, mongodb::error::Error> {
        let mut hosts = Vec::with_capacity(self.hosts.len());
        for host in &self.hosts {
            hosts.push(ServerAddress::parse(host)?);
        }

        let mut options = ClientOptions::default();
        options.hosts = hosts;
        options.app_name = Some(app.to_string());
        options.connect_timeout = Some(self.connect_timeout);
        options.server_selection_timeout = Some(self.connect_timeout);
        options.selection_criteria = Some(SelectionCriteria::ReadPreference(
            ReadPreference::Primary,
        ));
        options.read_concern = Some(ReadConcern::majority());

        let mut write_concern = WriteConcern::majority();
        write_concern.journal = Some(true);
        options.write_concern = Some(write_concern);

        if !self.username.is_empty() {
            let mut credential = Credential::default();
            credential.username = Some(self.username.clone());
            credential.password = Some(self.password.clone());
            credential.source = Some(self.database.clone());
            options.credential = Some(credential);
        }

        Ok(options)
    }
}

/// Per-handle adjustments for a detached acquisition.
///
/// Fields left `None` inherit the master entry's settings.
#[derive(Debug, Clone, Default)]
pub struct DialOverrides {
    /// Replacement dial/server-selection budget.
    pub connect_timeout: Option<Duration>,
    /// Replacement per-operation budget.
    pub op_timeout: Option<Duration>,
}
