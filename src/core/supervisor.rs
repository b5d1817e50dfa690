//! # Supervisor: one job, three phases, one resolved race.
//!
//! The [`Supervisor`] owns a single run of a user [`Job`]: it loads straps,
//! starts logging and alerting, launches the job as the run's one background
//! activity, and blocks until exactly one of three event sources resolves
//! the race. Teardown always runs afterwards and never decides the exit
//! status on its own.
//!
//! ## Phases
//! ```text
//! init:   straps (env var → <dir>/<env>.toml) → RunConfig → logging
//!         → subscribers (log writer, alert mailer) → Initialized
//!
//! start:  publish JobStarting ── launch(job, ctx) ─► spawned activity
//!         │
//!         ├─ deadline lapsed ──► abort job ─► TimeoutHit       ─► Err(Timeout)
//!         ├─ interrupt fired ──► flag + cancel ─► ShutdownRequested
//!         │       │
//!         │       ├─ deadline lapsed (still armed) ─► TimeoutHit ─► Err(Timeout)
//!         │       ├─ job exits within grace  ─► completion handling
//!         │       └─ grace lapsed ─► abort job ─► GraceExceeded ─► Err(GraceExceeded)
//!         └─ job completed ──► JobCompleted / JobFailed / JobPanicked
//!
//! close:  session pool shutdown (panic caught) ─► RunClosed / CloseFailed
//!         ─► subscriber drain (queued alert mail flushes before exit)
//! ```
//!
//! ## Rules
//! - The deadline always wins: when it is ready alongside any other source,
//!   the run ends through the timeout path, grace window included.
//! - An interrupt is cooperative first: the shutdown flag and cancel token
//!   fire, then the job gets up to [`RunConfig::grace`] to exit on its own
//!   before it is aborted.
//! - `close` runs exactly once, after `start` returns, whatever the
//!   outcome; its own failures are reported but never override the
//!   already-decided status.
//! - A job returning [`JobError::Canceled`] after observing shutdown is a
//!   graceful stop, not a failure.
//!
//! ## Example
//! ```no_run
//! use std::process::ExitCode;
//! use jobvisor::{JobContext, JobError, JobFn, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> ExitCode {
//!     let job = JobFn::arc("nightly-import", |ctx: JobContext| async move {
//!         while !ctx.is_shutdown() {
//!             // do one slice of work...
//!             break;
//!         }
//!         Ok::<_, JobError>(())
//!     });
//!
//!     Supervisor::run(job).await
//! }
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{JobError, RunError};
use crate::events::{Bus, Event, EventKind};
use crate::jobs::JobRef;
use crate::sessions::SessionPool;
use crate::straps::Straps;
use crate::subscribers::{AlertMailer, LogWriter, Subscribe, SubscriberSet};

use super::config::RunConfig;
use super::context::{JobContext, ShutdownFlag};
use super::logging;
use super::runner;
use super::shutdown;

/// Caller tag the supervisor stamps on its own pool operations.
const SUPERVISOR_TAG: &str = "supervisor";

/// Capacity of the embedder-facing event bus.
const BUS_CAPACITY: usize = 256;

/// Where one supervisor instance stands in its strictly sequential life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initialized,
    Started,
    Closed,
}

/// Coordinates one job's run: config, the event race, and teardown.
pub struct Supervisor {
    job: JobRef,
    cfg: RunConfig,
    straps: Arc<Straps>,
    bus: Bus,
    subs: SubscriberSet,
    sessions: SessionPool,
    shutdown: ShutdownFlag,
    cancel: CancellationToken,
    interrupt: CancellationToken,
    phase: Phase,
}

impl Supervisor {
    /// Builds a supervisor for `job` with the default subscribers.
    ///
    /// Loads straps from the job's [`ConfigSource`](crate::ConfigSource) (an
    /// unset environment variable fails here, before anything is launched),
    /// derives the [`RunConfig`], starts logging, and wires the log writer
    /// plus, when mail straps are present, the alert mailer.
    ///
    /// Must be called inside a Tokio runtime: subscriber workers are
    /// spawned at init.
    pub fn init(job: JobRef) -> Result<Self, RunError> {
        Self::init_with(job, Vec::new())
    }

    /// Like [`Supervisor::init`], with extra subscribers appended after the
    /// built-in ones.
    pub fn init_with(job: JobRef, extra: Vec<Arc<dyn Subscribe>>) -> Result<Self, RunError> {
        let source = job.config_source();
        let straps = Straps::load(&source.env_var, &source.dir)?;
        let cfg = RunConfig::from_straps(&straps)?;
        logging::startup(&cfg)?;

        let mut subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
        if let Some(mail) = cfg.mail.clone() {
            subscribers.push(Arc::new(AlertMailer::new(mail)));
        }
        subscribers.extend(extra);

        tracing::debug!(
            job = job.name(),
            machine = %cfg.machine,
            timeout = ?cfg.run_timeout(),
            grace = ?cfg.grace,
            "supervisor initialized"
        );

        Ok(Self {
            job,
            cfg,
            straps: Arc::new(straps),
            bus: Bus::new(BUS_CAPACITY),
            subs: SubscriberSet::new(subscribers),
            sessions: SessionPool::new(),
            shutdown: ShutdownFlag::new(),
            cancel: CancellationToken::new(),
            interrupt: CancellationToken::new(),
            phase: Phase::Initialized,
        })
    }

    /// Runs the full init → start → close sequence and maps the outcome to
    /// a process exit code: `SUCCESS` for a clean run, `FAILURE` for an
    /// init error, job failure, timeout, or lapsed grace.
    ///
    /// Start is additionally wrapped in a panic boundary so an unexpected
    /// fault still flows through alerting and teardown instead of
    /// unwinding out of `main`.
    pub async fn run(job: JobRef) -> ExitCode {
        let mut supervisor =
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| Self::init(job))) {
                Ok(Ok(supervisor)) => supervisor,
                Ok(Err(err)) => {
                    // Logging may not be up when init fails; stderr is all we have.
                    eprintln!("jobvisor init failed: {err}");
                    return ExitCode::FAILURE;
                }
                Err(payload) => {
                    eprintln!(
                        "jobvisor init panicked: {}",
                        runner::panic_message(payload)
                    );
                    return ExitCode::FAILURE;
                }
            };

        let outcome = match std::panic::AssertUnwindSafe(supervisor.start())
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = runner::panic_message(payload);
                supervisor.publish(
                    Event::new(EventKind::JobPanicked)
                        .with_job(supervisor.job.name())
                        .with_reason(message.as_str()),
                );
                Err(RunError::Panicked { message })
            }
        };

        if let Err(err) = supervisor.close().await {
            tracing::warn!(error = %err, "teardown reported a failure");
        }

        match outcome {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!(label = err.as_label(), error = %err, "run failed");
                ExitCode::FAILURE
            }
        }
    }

    /// Launches the job and blocks until the race resolves.
    ///
    /// Returns the job's own result for the completion path, or the error
    /// of whichever deadline ended the run. Called out of phase it does
    /// nothing and reports success.
    pub async fn start(&mut self) -> Result<(), RunError> {
        if self.phase != Phase::Initialized {
            tracing::warn!(phase = ?self.phase, "start called out of phase; ignoring");
            return Ok(());
        }
        self.phase = Phase::Started;

        shutdown::listen(self.interrupt.clone());
        self.publish(Event::new(EventKind::JobStarting).with_job(self.job.name()));

        let mut run = runner::launch(self.job.clone(), self.context());
        let deadline = self.arm_deadline();
        let interrupt = self.interrupt.clone();

        tokio::select! {
            biased;

            budget = deadline_wait(deadline) => self.timeout_exceeded(budget, &run),
            _ = interrupt.cancelled() => self.interrupt_received(deadline, &mut run).await,
            joined = &mut run => self.completed(joined),
        }
    }

    /// Releases run resources; always safe to call after `start`.
    ///
    /// Session pool teardown runs behind a panic boundary; a caught fault
    /// or teardown error is published as [`EventKind::CloseFailed`] and
    /// returned, without disturbing the run's already-decided status. The
    /// subscriber drain runs last so queued alert mail leaves before the
    /// process does. Idempotent.
    pub async fn close(&mut self) -> Result<(), RunError> {
        if self.phase == Phase::Closed {
            return Ok(());
        }
        self.phase = Phase::Closed;

        let sessions = self.sessions.clone();
        let teardown = std::panic::AssertUnwindSafe(async move {
            sessions.shutdown(SUPERVISOR_TAG).await
        })
        .catch_unwind()
        .await;

        let fault = match teardown {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.as_message()),
            Err(payload) => Some(runner::panic_message(payload)),
        };

        let outcome = match fault {
            None => {
                self.publish(Event::new(EventKind::RunClosed));
                Ok(())
            }
            Some(reason) => {
                self.publish(Event::new(EventKind::CloseFailed).with_reason(reason.as_str()));
                Err(RunError::Close { reason })
            }
        };

        self.subs.drain().await;
        outcome
    }

    /// The embedder-facing event bus; subscribe for a live tap of the run.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The loaded run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    /// The straps the run was configured from.
    pub fn straps(&self) -> &Straps {
        &self.straps
    }

    /// The run's session pool, for registering sessions before `start`.
    pub fn sessions(&self) -> &SessionPool {
        &self.sessions
    }

    /// Token that stands in for the OS interrupt.
    ///
    /// Cancelling it requests a shutdown exactly as a termination signal
    /// would, which keeps the interrupt path drivable programmatically.
    pub fn interrupt(&self) -> CancellationToken {
        self.interrupt.clone()
    }

    fn context(&self) -> JobContext {
        JobContext::new(
            Arc::clone(&self.straps),
            self.sessions.clone(),
            self.shutdown.clone(),
            self.cancel.clone(),
        )
    }

    /// Absolute run deadline plus its budget, armed once per start.
    fn arm_deadline(&self) -> Option<(Instant, Duration)> {
        self.cfg
            .run_timeout()
            .map(|budget| (Instant::now() + budget, budget))
    }

    /// Interrupt path: raise the flag, fire the cancel token, then give the
    /// job one grace window to exit while the run deadline stays armed.
    async fn interrupt_received(
        &self,
        deadline: Option<(Instant, Duration)>,
        run: &mut JoinHandle<Result<(), JobError>>,
    ) -> Result<(), RunError> {
        self.shutdown.request();
        self.cancel.cancel();
        self.publish(
            Event::new(EventKind::ShutdownRequested)
                .with_job(self.job.name())
                .with_grace(self.cfg.grace),
        );

        tokio::select! {
            biased;

            budget = deadline_wait(deadline) => self.timeout_exceeded(budget, run),
            graced = tokio::time::timeout(self.cfg.grace, &mut *run) => match graced {
                Ok(joined) => self.completed(joined),
                Err(_) => self.grace_exceeded(run),
            },
        }
    }

    /// Deadline path: forcible, wins over everything still in flight.
    fn timeout_exceeded(
        &self,
        budget: Duration,
        run: &JoinHandle<Result<(), JobError>>,
    ) -> Result<(), RunError> {
        self.cancel.cancel();
        run.abort();
        self.publish(
            Event::new(EventKind::TimeoutHit)
                .with_job(self.job.name())
                .with_timeout(budget),
        );
        Err(RunError::Timeout { timeout: budget })
    }

    /// Grace lapsed with the job still running; abort it and fail the run.
    fn grace_exceeded(&self, run: &JoinHandle<Result<(), JobError>>) -> Result<(), RunError> {
        run.abort();
        self.publish(
            Event::new(EventKind::GraceExceeded)
                .with_job(self.job.name())
                .with_grace(self.cfg.grace),
        );
        Err(RunError::GraceExceeded {
            grace: self.cfg.grace,
            job: self.job.name().to_string(),
        })
    }

    /// Completion path: unwrap the join and classify the job's outcome.
    fn completed(
        &self,
        joined: Result<Result<(), JobError>, JoinError>,
    ) -> Result<(), RunError> {
        match joined {
            Ok(Ok(())) => {
                self.publish(Event::new(EventKind::JobCompleted).with_job(self.job.name()));
                Ok(())
            }
            Ok(Err(JobError::Canceled)) => {
                // Acknowledged cancellation is a clean stop.
                self.publish(
                    Event::new(EventKind::JobCompleted)
                        .with_job(self.job.name())
                        .with_reason("stopped on shutdown request"),
                );
                Ok(())
            }
            Ok(Err(err)) => {
                self.publish(
                    Event::new(EventKind::JobFailed)
                        .with_job(self.job.name())
                        .with_reason(err.as_message().as_str()),
                );
                Err(RunError::Job(err))
            }
            Err(join_err) if join_err.is_panic() => {
                let message = runner::panic_message(join_err.into_panic());
                self.publish(
                    Event::new(EventKind::JobPanicked)
                        .with_job(self.job.name())
                        .with_reason(message.as_str()),
                );
                Err(RunError::Panicked { message })
            }
            Err(_) => {
                // Aborted from outside the race; treat as an external cancel.
                self.publish(
                    Event::new(EventKind::JobFailed)
                        .with_job(self.job.name())
                        .with_reason("job aborted"),
                );
                Err(RunError::Job(JobError::Canceled))
            }
        }
    }

    /// Feeds the subscriber set directly and mirrors onto the bus tap.
    fn publish(&self, event: Event) {
        self.subs.emit(&event);
        self.bus.publish(event);
    }
}

/// Resolves when the armed deadline lapses, yielding its budget; pends
/// forever when no deadline is configured.
async fn deadline_wait(deadline: Option<(Instant, Duration)>) -> Duration {
    match deadline {
        Some((at, budget)) => {
            tokio::time::sleep_until(at).await;
            budget
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobFn;
    use tokio::sync::broadcast;

    fn supervisor(job: JobRef, cfg: RunConfig) -> Supervisor {
        Supervisor {
            job,
            cfg,
            straps: Arc::new(Straps::from_toml_str("").unwrap()),
            bus: Bus::new(64),
            subs: SubscriberSet::new(Vec::new()),
            sessions: SessionPool::new(),
            shutdown: ShutdownFlag::new(),
            cancel: CancellationToken::new(),
            interrupt: CancellationToken::new(),
            phase: Phase::Initialized,
        }
    }

    fn drain_kinds(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        kinds
    }

    fn count(kinds: &[EventKind], kind: EventKind) -> usize {
        kinds.iter().filter(|k| **k == kind).count()
    }

    #[tokio::test]
    async fn test_completion_only_returns_job_status() {
        let job: JobRef = JobFn::arc("quick", |_ctx: JobContext| async {
            Ok::<_, JobError>(())
        });
        let mut sup = supervisor(job, RunConfig::default());
        let mut rx = sup.bus().subscribe();

        assert!(sup.start().await.is_ok());
        assert!(sup.close().await.is_ok());

        let kinds = drain_kinds(&mut rx);
        assert_eq!(count(&kinds, EventKind::JobStarting), 1);
        assert_eq!(count(&kinds, EventKind::JobCompleted), 1);
        assert_eq!(count(&kinds, EventKind::RunClosed), 1);
        assert_eq!(count(&kinds, EventKind::TimeoutHit), 0);
        assert_eq!(count(&kinds, EventKind::ShutdownRequested), 0);
    }

    #[tokio::test]
    async fn test_failing_job_fails_the_run() {
        let job: JobRef = JobFn::arc("broken", |_ctx: JobContext| async {
            Err::<(), _>(JobError::fail("import blew up"))
        });
        let mut sup = supervisor(job, RunConfig::default());
        let mut rx = sup.bus().subscribe();

        let err = sup.start().await.unwrap_err();
        assert!(matches!(err, RunError::Job(JobError::Fail { .. })));
        assert!(sup.close().await.is_ok());

        let kinds = drain_kinds(&mut rx);
        assert_eq!(count(&kinds, EventKind::JobFailed), 1);
        assert_eq!(count(&kinds, EventKind::RunClosed), 1);
    }

    #[tokio::test]
    async fn test_panicking_job_is_caught_at_the_join_boundary() {
        let job: JobRef = JobFn::arc("explosive", |_ctx: JobContext| async {
            if true {
                panic!("wires crossed");
            }
            Ok::<_, JobError>(())
        });
        let mut sup = supervisor(job, RunConfig::default());
        let mut rx = sup.bus().subscribe();

        let err = sup.start().await.unwrap_err();
        assert!(matches!(err, RunError::Panicked { ref message } if message == "wires crossed"));
        assert!(sup.close().await.is_ok());

        let kinds = drain_kinds(&mut rx);
        assert_eq!(count(&kinds, EventKind::JobPanicked), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_only_ends_the_run_non_zero() {
        let job: JobRef = JobFn::arc("sleeper", |_ctx: JobContext| async {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok::<_, JobError>(())
        });
        let cfg = RunConfig {
            run_timeout: Duration::from_millis(50),
            ..RunConfig::default()
        };
        let mut sup = supervisor(job, cfg);
        let mut rx = sup.bus().subscribe();

        let err = sup.start().await.unwrap_err();
        assert!(matches!(err, RunError::Timeout { timeout } if timeout == Duration::from_millis(50)));
        assert!(sup.close().await.is_ok());

        let kinds = drain_kinds(&mut rx);
        assert_eq!(count(&kinds, EventKind::TimeoutHit), 1);
        assert_eq!(count(&kinds, EventKind::JobCompleted), 0);
        assert_eq!(count(&kinds, EventKind::ShutdownRequested), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_beats_generous_timeout() {
        let job: JobRef = JobFn::arc("brisk", |_ctx: JobContext| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, JobError>(())
        });
        let cfg = RunConfig {
            run_timeout: Duration::from_secs(10),
            ..RunConfig::default()
        };
        let mut sup = supervisor(job, cfg);
        let mut rx = sup.bus().subscribe();

        assert!(sup.start().await.is_ok());

        let kinds = drain_kinds(&mut rx);
        assert_eq!(count(&kinds, EventKind::JobCompleted), 1);
        assert_eq!(count(&kinds, EventKind::TimeoutHit), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_wins_over_near_simultaneous_completion() {
        // Job and deadline land on the same instant; the deadline arm is
        // polled first, so the run must end through the timeout path.
        let job: JobRef = JobFn::arc("neck-and-neck", |_ctx: JobContext| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, JobError>(())
        });
        let cfg = RunConfig {
            run_timeout: Duration::from_millis(100),
            ..RunConfig::default()
        };
        let mut sup = supervisor(job, cfg);
        let mut rx = sup.bus().subscribe();

        let err = sup.start().await.unwrap_err();
        assert!(matches!(err, RunError::Timeout { .. }));

        let kinds = drain_kinds(&mut rx);
        assert_eq!(count(&kinds, EventKind::TimeoutHit), 1);
        assert_eq!(count(&kinds, EventKind::JobCompleted), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_only_cooperative_shutdown() {
        let job: JobRef = JobFn::arc("cooperative", |ctx: JobContext| async move {
            while !ctx.is_shutdown() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Ok::<_, JobError>(())
        });
        let cfg = RunConfig {
            grace: Duration::from_secs(5),
            ..RunConfig::default()
        };
        let mut sup = supervisor(job, cfg);
        let mut rx = sup.bus().subscribe();

        let interrupt = sup.interrupt();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            interrupt.cancel();
        });

        assert!(sup.start().await.is_ok());
        assert!(sup.close().await.is_ok());

        let kinds = drain_kinds(&mut rx);
        assert_eq!(count(&kinds, EventKind::ShutdownRequested), 1);
        assert_eq!(count(&kinds, EventKind::JobCompleted), 1);
        assert_eq!(count(&kinds, EventKind::GraceExceeded), 0);
        assert_eq!(count(&kinds, EventKind::TimeoutHit), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_token_drives_select_style_jobs() {
        let job: JobRef = JobFn::arc("selecting", |ctx: JobContext| async move {
            tokio::select! {
                _ = ctx.cancelled() => Err(JobError::Canceled),
                _ = tokio::time::sleep(Duration::from_secs(600)) => Ok(()),
            }
        });
        let cfg = RunConfig {
            grace: Duration::from_secs(5),
            ..RunConfig::default()
        };
        let mut sup = supervisor(job, cfg);
        let mut rx = sup.bus().subscribe();

        let interrupt = sup.interrupt();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            interrupt.cancel();
        });

        // Acknowledged cancellation counts as a graceful stop.
        assert!(sup.start().await.is_ok());

        let kinds = drain_kinds(&mut rx);
        assert_eq!(count(&kinds, EventKind::ShutdownRequested), 1);
        assert_eq!(count(&kinds, EventKind::JobCompleted), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_exceeded_when_job_ignores_shutdown() {
        let job: JobRef = JobFn::arc("stubborn", |_ctx: JobContext| async {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok::<_, JobError>(())
        });
        let cfg = RunConfig {
            grace: Duration::from_millis(100),
            ..RunConfig::default()
        };
        let mut sup = supervisor(job, cfg);
        let mut rx = sup.bus().subscribe();

        let interrupt = sup.interrupt();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            interrupt.cancel();
        });

        let err = sup.start().await.unwrap_err();
        assert!(matches!(err, RunError::GraceExceeded { ref job, .. } if job == "stubborn"));
        assert!(sup.close().await.is_ok());

        let kinds = drain_kinds(&mut rx);
        assert_eq!(count(&kinds, EventKind::ShutdownRequested), 1);
        assert_eq!(count(&kinds, EventKind::GraceExceeded), 1);
        assert_eq!(count(&kinds, EventKind::JobCompleted), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stays_armed_through_the_grace_window() {
        let job: JobRef = JobFn::arc("doomed", |_ctx: JobContext| async {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok::<_, JobError>(())
        });
        let cfg = RunConfig {
            run_timeout: Duration::from_millis(200),
            grace: Duration::from_secs(30),
            ..RunConfig::default()
        };
        let mut sup = supervisor(job, cfg);
        let mut rx = sup.bus().subscribe();

        let interrupt = sup.interrupt();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            interrupt.cancel();
        });

        // Interrupt at 50ms opens a 30s grace window, but the 200ms run
        // deadline lapses first and must still end the run.
        let err = sup.start().await.unwrap_err();
        assert!(matches!(err, RunError::Timeout { .. }));

        let kinds = drain_kinds(&mut rx);
        assert_eq!(count(&kinds, EventKind::ShutdownRequested), 1);
        assert_eq!(count(&kinds, EventKind::TimeoutHit), 1);
        assert_eq!(count(&kinds, EventKind::GraceExceeded), 0);
    }

    #[tokio::test]
    async fn test_close_runs_once_and_is_idempotent() {
        let job: JobRef = JobFn::arc("quick", |_ctx: JobContext| async {
            Ok::<_, JobError>(())
        });
        let mut sup = supervisor(job, RunConfig::default());
        let mut rx = sup.bus().subscribe();

        assert!(sup.start().await.is_ok());
        assert!(sup.close().await.is_ok());
        assert!(sup.close().await.is_ok());

        let kinds = drain_kinds(&mut rx);
        assert_eq!(count(&kinds, EventKind::RunClosed), 1);
    }

    #[tokio::test]
    async fn test_second_start_does_not_relaunch() {
        let job: JobRef = JobFn::arc("quick", |_ctx: JobContext| async {
            Ok::<_, JobError>(())
        });
        let mut sup = supervisor(job, RunConfig::default());
        let mut rx = sup.bus().subscribe();

        assert!(sup.start().await.is_ok());
        assert!(sup.start().await.is_ok());

        let kinds = drain_kinds(&mut rx);
        assert_eq!(count(&kinds, EventKind::JobStarting), 1);
    }

    #[tokio::test]
    async fn test_init_fails_fast_on_missing_environment() {
        use crate::jobs::{ConfigSource, Job};
        use async_trait::async_trait;

        struct Orphan;

        #[async_trait]
        impl Job for Orphan {
            fn name(&self) -> &str {
                "orphan"
            }

            fn config_source(&self) -> ConfigSource {
                ConfigSource::new("JOBVISOR_TEST_SUP_UNSET_ENV", "straps")
            }

            async fn run(&self, _ctx: JobContext) -> Result<(), JobError> {
                Ok(())
            }
        }

        std::env::remove_var("JOBVISOR_TEST_SUP_UNSET_ENV");
        let Err(err) = Supervisor::init(Arc::new(Orphan)) else {
            panic!("init without the selector variable must fail");
        };
        assert!(matches!(
            err,
            RunError::Strap(crate::straps::StrapError::MissingEnv { ref var })
                if var == "JOBVISOR_TEST_SUP_UNSET_ENV"
        ));
    }

    #[tokio::test]
    async fn test_init_builds_from_strapped_environment() {
        use crate::jobs::{ConfigSource, Job};
        use async_trait::async_trait;

        struct Strapped {
            dir: std::path::PathBuf,
        }

        #[async_trait]
        impl Job for Strapped {
            fn name(&self) -> &str {
                "strapped"
            }

            fn config_source(&self) -> ConfigSource {
                ConfigSource::new("JOBVISOR_TEST_SUP_INIT_ENV", self.dir.clone())
            }

            async fn run(&self, _ctx: JobContext) -> Result<(), JobError> {
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("test.toml"),
            "machine_name = \"rig\"\nconsole_log_only = true\nrun_timeout_seconds = 90\n",
        )
        .unwrap();
        std::env::set_var("JOBVISOR_TEST_SUP_INIT_ENV", "test");

        let sup = Supervisor::init(Arc::new(Strapped {
            dir: dir.path().to_path_buf(),
        }))
        .unwrap();
        assert_eq!(sup.config().machine, "rig");
        assert_eq!(sup.config().run_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(sup.straps().strap("machine_name").unwrap(), "rig");

        std::env::remove_var("JOBVISOR_TEST_SUP_INIT_ENV");
    }
}
