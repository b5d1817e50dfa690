//! # Database sessions.
//!
//! Pooled, named connections to the document store and the handles jobs use
//! to reach them.
//!
//! ```text
//!                  ┌───────────────────────────────┐
//!                  │          SessionPool          │
//!                  │  "master" ─► Client (verified)│
//!                  │  "archive" ─► Client          │
//!                  └──────┬─────────────────┬──────┘
//!             acquire     │                 │   acquire_detached
//!                         ▼                 ▼
//!                SessionHandle       SessionHandle
//!                (SharedConfig)     (DetachedConfig)
//! ```
//!
//! - [`SessionPool`]: registry of named master connections.
//! - [`SessionHandle`]: a caller's lease on one session.
//! - [`DialSettings`] / [`DialOverrides`]: how a master dials, and how a
//!   detached handle deviates from it.
//! - [`SessionError`]: what can go wrong, with retriability attached.

mod dial;
mod error;
mod handle;
mod pool;

pub use dial::{DialOverrides, DialSettings, DEFAULT_CONNECT_TIMEOUT, DEFAULT_OP_TIMEOUT};
pub use error::SessionError;
pub use handle::{AcquireMode, SessionHandle};
pub use pool::{SessionPool, MASTER_SESSION};
