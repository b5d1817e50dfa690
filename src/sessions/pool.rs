//! # Named session pool.
//!
//! [`SessionPool`] keeps one long-lived, authenticated master connection per
//! logical database target and hands out derived [`SessionHandle`]s to
//! callers. Sessions are keyed by name, not by caller identity, so unrelated
//! collaborators share one physical pool per backing store without
//! re-dialing.
//!
//! ## Rules
//! - An entry is inserted only after its connection authenticated and
//!   answered a ping; a partially-built entry is never visible.
//! - Re-registering a name silently replaces the old entry: same-name
//!   registration is a deliberate reconnect. The previous connection is
//!   released in the background of the call.
//! - Registry mutation (`startup`/`create_session`/`shutdown`) is serialized
//!   behind one RwLock; acquired handles are independent of later mutation.
//! - Teardown never gives up early: every entry is released even when an
//!   earlier one is slow or broken.
//!
//! ## Example
//! ```no_run
//! use jobvisor::{DialSettings, SessionPool, MASTER_SESSION};
//!
//! # async fn demo() -> Result<(), jobvisor::SessionError> {
//! let pool = SessionPool::new();
//! let dial = DialSettings::new(vec!["db1:27017".into()], "jobs", "runner", "secret");
//! pool.create_session("demo", MASTER_SESSION, dial).await?;
//!
//! let handle = pool.acquire("demo", MASTER_SESSION).await?;
//! assert!(handle.collection_exists("demo", "jobs", "job_records").await || true);
//! pool.release("demo", handle).await;
//!
//! pool.shutdown("demo").await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use mongodb::bson::doc;
use mongodb::Client;
use tokio::sync::RwLock;

use crate::straps::Straps;

use super::dial::{DialOverrides, DialSettings};
use super::error::SessionError;
use super::handle::{AcquireMode, SessionHandle};

/// Name of the session created by [`SessionPool::startup`].
pub const MASTER_SESSION: &str = "master";

/// Application name reported to the server for connection attribution.
const APP_NAME: &str = "jobvisor";

/// One registered master connection.
struct SessionEntry {
    dial: DialSettings,
    client: Client,
}

/// Registry of named master connections.
///
/// Cheap to clone; clones share the registry. One pool instance typically
/// lives inside the job context for the duration of a run.
#[derive(Clone)]
pub struct SessionPool {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
}

impl SessionPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Reads dial straps and registers the [`MASTER_SESSION`] entry.
    ///
    /// Consumes `mongo_hosts`, `mongo_database`, `mongo_username`,
    /// `mongo_password` and the optional timeout straps. A failed dial
    /// leaves the registry without the entry; the error is retriable by
    /// calling again.
    pub async fn startup(&self, caller: &str, straps: &Straps) -> Result<(), SessionError> {
        let dial = DialSettings::from_straps(straps)?;
        self.create_session(caller, MASTER_SESSION, dial).await
    }

    /// Dials, authenticates, verifies, and registers a session under `name`.
    ///
    /// The connection is configured for primary-only reads and journaled
    /// write acknowledgement, then proven live with a `ping` before the
    /// entry becomes visible. On failure the registry is not mutated.
    pub async fn create_session(
        &self,
        caller: &str,
        name: &str,
        dial: DialSettings,
    ) -> Result<(), SessionError> {
        tracing::debug!(
            caller,
            session = name,
            hosts = ?dial.hosts,
            database = %dial.database,
            "create session started"
        );

        let client = self.connect(name, &dial).await?;

        let previous = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(name.to_string(), SessionEntry { dial, client })
        };
        if let Some(entry) = previous {
            tracing::debug!(caller, session = name, "session re-registered; releasing previous");
            entry.client.shutdown().await;
        }

        tracing::debug!(caller, session = name, "create session completed");
        Ok(())
    }

    /// Returns a shared-config handle for the session registered under `name`.
    ///
    /// Cheap: clones the master's client, which multiplexes over its own
    /// connection pool. Absent names return [`SessionError::NotFound`].
    pub async fn acquire(&self, caller: &str, name: &str) -> Result<SessionHandle, SessionError> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(name).ok_or_else(|| SessionError::NotFound {
            name: name.to_string(),
        })?;

        tracing::debug!(caller, session = name, mode = "shared", "session acquired");
        Ok(SessionHandle {
            client: entry.client.clone(),
            session: name.to_string(),
            database: entry.dial.database.clone(),
            mode: AcquireMode::SharedConfig,
            op_timeout: entry.dial.op_timeout,
        })
    }

    /// Returns a detached-config handle: a fresh client built from the
    /// entry's dial settings merged with `overrides`, so the handle's
    /// timeouts can be tuned independently of the parent.
    ///
    /// The client dials lazily on first use; the master entry already proved
    /// the target reachable and the credentials valid.
    pub async fn acquire_detached(
        &self,
        caller: &str,
        name: &str,
        overrides: DialOverrides,
    ) -> Result<SessionHandle, SessionError> {
        let dial = {
            let sessions = self.sessions.read().await;
            let entry = sessions.get(name).ok_or_else(|| SessionError::NotFound {
                name: name.to_string(),
            })?;
            entry.dial.merged(&overrides)
        };

        let options = dial
            .client_options(APP_NAME)
            .map_err(|source| SessionError::Connect {
                name: name.to_string(),
                source,
            })?;
        let client = Client::with_options(options).map_err(|source| SessionError::Connect {
            name: name.to_string(),
            source,
        })?;

        tracing::debug!(caller, session = name, mode = "detached", "session acquired");
        Ok(SessionHandle {
            client,
            session: name.to_string(),
            database: dial.database.clone(),
            mode: AcquireMode::DetachedConfig,
            op_timeout: dial.op_timeout,
        })
    }

    /// Releases an acquired handle.
    ///
    /// Consumes the handle, so releasing twice is a compile error rather
    /// than a caller obligation. Shared handles drop their reference to the
    /// master's client; detached handles shut their private client down.
    pub async fn release(&self, caller: &str, handle: SessionHandle) {
        let session = handle.session.clone();
        match handle.mode {
            AcquireMode::SharedConfig => drop(handle),
            AcquireMode::DetachedConfig => handle.client.shutdown().await,
        }
        tracing::debug!(caller, session = %session, "session released");
    }

    /// True when a session is registered under `name`.
    pub async fn contains(&self, name: &str) -> bool {
        self.sessions.read().await.contains_key(name)
    }

    /// Returns sorted names of all registered sessions.
    pub async fn names(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut names: Vec<String> = sessions.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// True when no sessions are registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drains the registry and releases every master connection.
    ///
    /// Each entry gets up to its own operation timeout for a graceful
    /// close; a slow close is dropped instead, and the loop always moves on
    /// to the remaining entries.
    pub async fn shutdown(&self, caller: &str) -> Result<(), SessionError> {
        let entries: Vec<(String, SessionEntry)> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().collect()
        };

        let total = entries.len();
        for (name, entry) in entries {
            let budget = entry.dial.op_timeout;
            if close_with_budget(entry.client.shutdown().into_future(), budget).await {
                tracing::debug!(caller, session = %name, "session closed");
            } else {
                tracing::warn!(
                    caller,
                    session = %name,
                    budget_ms = budget.as_millis() as u64,
                    "session close timed out; connection dropped"
                );
            }
        }

        tracing::debug!(caller, sessions = total, "session pool shut down");
        Ok(())
    }

    /// Dial, authenticate, and prove the connection with a ping.
    async fn connect(&self, name: &str, dial: &DialSettings) -> Result<Client, SessionError> {
        let options = dial
            .client_options(APP_NAME)
            .map_err(|source| SessionError::Connect {
                name: name.to_string(),
                source,
            })?;
        let client = Client::with_options(options).map_err(|source| SessionError::Connect {
            name: name.to_string(),
            source,
        })?;

        // The driver dials lazily; the ping is what actually proves the
        // host list, credentials, and selection settings. Bounded by
        // server_selection_timeout.
        let ping = client
            .database(&dial.database)
            .run_command(doc! { "ping": 1 })
            .await;
        if let Err(source) = ping {
            client.shutdown().await;
            return Err(SessionError::Connect {
                name: name.to_string(),
                source,
            });
        }
        Ok(client)
    }
}

impl Default for SessionPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounds one connection close; `false` means the budget lapsed and the
/// close was abandoned.
async fn close_with_budget(close: impl Future<Output = ()>, budget: Duration) -> bool {
    tokio::time::timeout(budget, close).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unroutable_dial() -> DialSettings {
        // Port 1 on loopback refuses immediately; keeps the failure path fast.
        DialSettings::new(vec!["127.0.0.1:1".to_string()], "jobs", "", "")
            .with_connect_timeout(Duration::from_millis(200))
            .with_op_timeout(Duration::from_millis(200))
    }

    fn lazy_entry(dial: &DialSettings) -> SessionEntry {
        // Client::with_options never dials; safe without a server.
        let options = dial.client_options(APP_NAME).unwrap();
        SessionEntry {
            dial: dial.clone(),
            client: Client::with_options(options).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_acquire_missing_session_returns_not_found() {
        let pool = SessionPool::new();
        let Err(err) = pool.acquire("test", "missing").await else {
            panic!("acquire of an unregistered name must fail");
        };
        assert!(matches!(err, SessionError::NotFound { name } if name == "missing"));
    }

    #[tokio::test]
    async fn test_acquire_detached_missing_session_returns_not_found() {
        let pool = SessionPool::new();
        let Err(err) = pool
            .acquire_detached("test", "missing", DialOverrides::default())
            .await
        else {
            panic!("acquire of an unregistered name must fail");
        };
        assert!(matches!(err, SessionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_failed_create_leaves_registry_unmutated() {
        let pool = SessionPool::new();
        let err = pool
            .create_session("test", "s1", unroutable_dial())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Connect { .. }));
        assert!(err.is_retryable());
        assert!(pool.is_empty().await);
        assert!(!pool.contains("s1").await);
    }

    #[tokio::test]
    async fn test_acquire_returns_entry_scoped_handle() {
        let pool = SessionPool::new();
        let dial = unroutable_dial().with_op_timeout(Duration::from_secs(3));
        pool.sessions
            .write()
            .await
            .insert("s1".to_string(), lazy_entry(&dial));

        let handle = pool.acquire("test", "s1").await.unwrap();
        assert_eq!(handle.session_name(), "s1");
        assert_eq!(handle.database_name(), "jobs");
        assert_eq!(handle.mode(), AcquireMode::SharedConfig);
        assert_eq!(handle.op_timeout(), Duration::from_secs(3));
        pool.release("test", handle).await;

        // Releasing a shared handle leaves the entry registered.
        assert!(pool.contains("s1").await);
    }

    #[tokio::test]
    async fn test_detached_handle_applies_overrides() {
        let pool = SessionPool::new();
        let dial = unroutable_dial();
        pool.sessions
            .write()
            .await
            .insert("s1".to_string(), lazy_entry(&dial));

        let handle = pool
            .acquire_detached(
                "test",
                "s1",
                DialOverrides {
                    connect_timeout: None,
                    op_timeout: Some(Duration::from_millis(50)),
                },
            )
            .await
            .unwrap();
        assert_eq!(handle.mode(), AcquireMode::DetachedConfig);
        assert_eq!(handle.op_timeout(), Duration::from_millis(50));
        pool.release("test", handle).await;
    }

    #[tokio::test]
    async fn test_collection_probe_swallows_transport_errors() {
        let pool = SessionPool::new();
        let dial = unroutable_dial();
        pool.sessions
            .write()
            .await
            .insert("s1".to_string(), lazy_entry(&dial));

        let handle = pool.acquire("test", "s1").await.unwrap();
        // No server behind the address; the probe must answer false, not error.
        assert!(!handle.collection_exists("test", "jobs", "job_records").await);
        pool.release("test", handle).await;
    }

    #[tokio::test]
    async fn test_shutdown_releases_every_entry() {
        let pool = SessionPool::new();
        let dial = unroutable_dial();
        {
            let mut sessions = pool.sessions.write().await;
            for name in ["s1", "s2", "s3"] {
                sessions.insert(name.to_string(), lazy_entry(&dial));
            }
        }
        assert_eq!(pool.len().await, 3);
        assert_eq!(pool.names().await, vec!["s1", "s2", "s3"]);

        pool.shutdown("test").await.unwrap();
        assert!(pool.is_empty().await);

        // A second shutdown over the drained registry is a no-op.
        pool.shutdown("test").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_budget_lapse_abandons_slow_close() {
        assert!(close_with_budget(std::future::ready(()), Duration::from_millis(100)).await);
        assert!(!close_with_budget(std::future::pending(), Duration::from_millis(100)).await);
    }

    #[tokio::test]
    async fn test_shutdown_drains_past_a_lapsed_entry() {
        let pool = SessionPool::new();
        let patient = unroutable_dial();
        // Zero budget invites a lapse on s2; the drain must still reach
        // the other entries either way.
        let lapsing = unroutable_dial().with_op_timeout(Duration::ZERO);
        {
            let mut sessions = pool.sessions.write().await;
            sessions.insert("s1".to_string(), lazy_entry(&patient));
            sessions.insert("s2".to_string(), lazy_entry(&lapsing));
            sessions.insert("s3".to_string(), lazy_entry(&patient));
        }
        assert_eq!(pool.len().await, 3);

        pool.shutdown("test").await.unwrap();
        assert!(pool.is_empty().await);
    }
}
