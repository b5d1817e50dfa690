//! Runtime core: the supervised run.
//!
//! This module contains the supervisor and its collaborators: per-run
//! configuration, the job-facing context, logging startup, the launch
//! boundary, and interrupt wiring.
//!
//! ## Wiring
//! ```text
//!            init                          start                       close
//!  straps ─► RunConfig ─► logging   ┌─► runner::launch ─► Job.run(ctx)
//!                │                  │         ▲
//!                ▼                  │         │ JobContext
//!          subscribers      Supervisor ───────┤   (straps, sessions,
//!          (log, mail)              │         │    shutdown flag,
//!                                   │         │    cancel token)
//!        OS signal ─► shutdown::listen ─► interrupt token
//!                                   │
//!                                   └─► events ─► SubscriberSet + Bus ─► drain
//! ```
//!
//! Internal modules:
//! - [`config`]: [`RunConfig`] loaded from straps, with sentinel helpers;
//! - [`context`]: [`JobContext`] and [`ShutdownFlag`] handed to the job;
//! - [`logging`]: console/dated-file `tracing` startup plus retention sweep;
//! - [`runner`]: spawns the job as the run's one bounded background activity;
//! - [`shutdown`]: cross-platform interrupt listening onto a cancel token;
//! - [`supervisor`]: the three-phase lifecycle and the event race.

mod config;
mod context;
mod logging;
mod runner;
mod shutdown;
mod supervisor;

pub use config::{RunConfig, DEFAULT_GRACE, DEFAULT_LOG_KEEP_DAYS};
pub use context::{JobContext, ShutdownFlag};
pub use supervisor::Supervisor;
