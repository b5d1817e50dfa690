//! # Acquired session handles.
//!
//! A [`SessionHandle`] is the per-caller view of a named master connection.
//! Two acquisition modes exist, mirroring the copy/clone split of classic
//! driver pools:
//!
//! - [`AcquireMode::SharedConfig`] - the handle shares the master's client
//!   and configuration. Cheap, no dialing; releasing it returns the caller's
//!   reference and leaves the master untouched.
//! - [`AcquireMode::DetachedConfig`] - the handle is rebuilt from the
//!   entry's dial settings merged with caller overrides, so its timeouts can
//!   be tuned independently of the parent. Releasing it shuts its client
//!   down.
//!
//! Handles are consumed by [`SessionPool::release`](crate::SessionPool::release);
//! a double release does not compile.

use std::time::Duration;

use mongodb::{Client, Database};

/// How a handle relates to its master entry's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireMode {
    /// Shares the master's client and configuration (copy semantics).
    SharedConfig,
    /// Independent client rebuilt with caller overrides (clone semantics).
    DetachedConfig,
}

/// A per-caller session view handed out by the pool.
///
/// The handle shares the master's authenticated identity; concurrent
/// holders never contend on each other's in-flight operations because the
/// driver multiplexes over its own connection pool per client.
pub struct SessionHandle {
    pub(crate) client: Client,
    pub(crate) session: String,
    pub(crate) database: String,
    pub(crate) mode: AcquireMode,
    pub(crate) op_timeout: Duration,
}

impl SessionHandle {
    /// Name of the pool entry this handle was acquired from.
    pub fn session_name(&self) -> &str {
        &self.session
    }

    /// The entry's target database name.
    pub fn database_name(&self) -> &str {
        &self.database
    }

    /// Acquisition mode of this handle.
    pub fn mode(&self) -> AcquireMode {
        self.mode
    }

    /// Per-operation budget callers should apply to their own calls.
    pub fn op_timeout(&self) -> Duration {
        self.op_timeout
    }

    /// The entry's target database.
    pub fn database(&self) -> Database {
        self.client.database(&self.database)
    }

    /// A different database over the same authenticated identity.
    pub fn database_named(&self, name: &str) -> Database {
        self.client.database(name)
    }

    /// Best-effort existence probe for a collection.
    ///
    /// Advisory only: transport errors and probe timeouts are swallowed and
    /// reported as "does not exist" so callers never have to unwind from a
    /// flaky check.
    pub async fn collection_exists(&self, caller: &str, database: &str, collection: &str) -> bool {
        let db = self.client.database(database);
        match tokio::time::timeout(self.op_timeout, db.list_collection_names()).await {
            Ok(Ok(names)) => names.iter().any(|n| n == collection),
            Ok(Err(e)) => {
                tracing::debug!(caller, database, collection, error = %e, "collection probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(caller, database, collection, "collection probe timed out");
                false
            }
        }
    }
}
