//! # jobvisor
//!
//! **Jobvisor** is a supervisor for one-shot batch jobs.
//!
//! It wraps a single async job in a strict init/start/close lifecycle,
//! races the job against an OS interrupt and a hard run timeout, and
//! carries the operational plumbing a production batch host needs:
//! environment-selected configuration, dated log files with retention,
//! alert mail, a named MongoDB session pool, and run history records.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                      ┌────────────────────┐
//!                      │        Job         │
//!                      │ (name, config      │
//!                      │  source, async run)│
//!                      └─────────┬──────────┘
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (init ─► start ─► close)                              │
//! │  - RunConfig (straps: machine, logging, deadlines, mail)          │
//! │  - SessionPool (named MongoDB sessions, shared/detached handles)  │
//! │  - SubscriberSet (per-subscriber queues: LogWriter, AlertMailer)  │
//! │  - Bus (broadcast tap for embedders)                              │
//! └─────────┬──────────────────────┬──────────────────────┬───────────┘
//!           ▼                      ▼                      ▼
//!    deadline lapsed        interrupt fired         job completed
//!    (abort, Timeout)    (flag + cancel token,   (Ok / JobError /
//!                         grace, then abort)      caught panic)
//!           │                      │                      │
//!           └──────────────────────┴──────────────────────┘
//!                    exactly one source resolves the race
//! ```
//!
//! ### Lifecycle
//! ```text
//! JobRef ──► Supervisor::run() ──► ExitCode
//!
//! init  ├─► straps: $ENV_VAR names the environment ─► <dir>/<env>.toml
//!       ├─► RunConfig (machine, console/file logging, timeout, grace, mail)
//!       ├─► logging startup (dated files + retention sweep, unless console-only)
//!       └─► subscribers: LogWriter [+ AlertMailer when mail is strapped]
//!
//! start ├─► publish JobStarting
//!       ├─► launch job (spawned; the join is the panic boundary)
//!       └─► select (biased):
//!             ├─ deadline lapsed  ─► abort ─► TimeoutHit    ─► Err(Timeout)
//!             ├─ interrupt fired  ─► flag + cancel ─► grace window
//!             │     ├─ deadline lapsed (still armed) ─► Err(Timeout)
//!             │     ├─ job exits in time ─► completion handling
//!             │     └─ grace lapsed ─► abort ─► Err(GraceExceeded)
//!             └─ job completed ─► JobCompleted / JobFailed / JobPanicked
//!
//! close ├─► session pool shutdown (bounded per session, panic caught)
//!       ├─► publish RunClosed / CloseFailed
//!       └─► subscriber drain (queued alert mail flushes before exit)
//! ```
//!
//! ## Features
//! | Area               | Description                                                       | Key types / traits                   |
//! |--------------------|-------------------------------------------------------------------|--------------------------------------|
//! | **Supervision**    | One job per run: init/start/close and a deterministically resolved race. | [`Supervisor`]                 |
//! | **Jobs**           | Define work as trait impls or closures; cancel-aware contexts.    | [`Job`], [`JobFn`], [`JobContext`]   |
//! | **Sessions**       | Named MongoDB session registry with shared and detached handles.  | [`SessionPool`], [`SessionHandle`]   |
//! | **Straps**         | Flat TOML configuration selected by environment variable.         | [`Straps`]                           |
//! | **Subscriber API** | Observe lifecycle events (logging, alert mail, custom).           | [`Subscribe`]                        |
//! | **History**        | Run records with start/end, outcome, and detail entries.          | [`history`]                          |
//! | **Errors**         | Typed errors for the run and for job execution.                   | [`RunError`], [`JobError`]           |
//!
//! ## Example
//! ```no_run
//! use std::process::ExitCode;
//! use jobvisor::{JobContext, JobError, JobFn, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> ExitCode {
//!     // Straps come from $JOBVISOR_ENV ─► config/<env>.toml by default.
//!     let job = JobFn::arc("nightly-import", |ctx: JobContext| async move {
//!         while !ctx.is_shutdown() {
//!             // one slice of work per iteration...
//!             break;
//!         }
//!         Ok::<_, JobError>(())
//!     });
//!
//!     Supervisor::run(job).await
//! }
//! ```
mod core;
mod error;
mod events;
mod jobs;
mod sessions;
mod straps;
mod subscribers;
mod web;

pub mod history;

// ---- Public re-exports ----

pub use core::{
    JobContext, RunConfig, ShutdownFlag, Supervisor, DEFAULT_GRACE, DEFAULT_LOG_KEEP_DAYS,
};
pub use error::{JobError, RunError};
pub use events::{Bus, Event, EventKind};
pub use jobs::{ConfigSource, Job, JobFn, JobRef};
pub use sessions::{
    AcquireMode, DialOverrides, DialSettings, SessionError, SessionHandle, SessionPool,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_OP_TIMEOUT, MASTER_SESSION,
};
pub use straps::{StrapError, Straps};
pub use subscribers::{
    AlertMailer, LogWriter, MailError, MailSettings, Subscribe, SubscriberSet,
};
pub use web::{HttpClient, HttpError, HttpSettings};
