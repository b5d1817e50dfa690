//! # Example: one_shot_job
//!
//! Minimal supervised run: one cooperative job under the full lifecycle.
//!
//! Demonstrates how to:
//! - Define a job with [`JobFn`] and point it at a straps file.
//! - Let [`Supervisor::run`] drive init ─► start ─► close.
//! - Stop cooperatively on Ctrl-C, or let the strapped 10s timeout cap the run.
//!
//! ## Flow
//! ```text
//! JobFn ──► Supervisor::run()
//!     ├─► init: demos/config/demo.toml ─► RunConfig ─► logging ─► subscribers
//!     ├─► start: publish(JobStarting) ─► launch job
//!     │     ├─► Ctrl-C  ─► ShutdownRequested ─► job sees flag ─► JobCompleted
//!     │     └─► 10s cap ─► TimeoutHit ─► abort ─► non-zero exit
//!     └─► close: publish(RunClosed) ─► drain subscribers ─► ExitCode
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example one_shot_job
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use jobvisor::{ConfigSource, JobContext, JobError, JobFn, JobRef, Supervisor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // 1. Point the run at the demo straps. A real deployment sets the
    //    environment variable itself and the program never touches it.
    std::env::set_var("JOBVISOR_DEMO_ENV", "demo");
    let source = ConfigSource::new("JOBVISOR_DEMO_ENV", "demos/config");

    // 2. Define a cooperative job: tick until told to stop.
    let ticker = JobFn::new("ticker", |ctx: JobContext| async move {
        println!("[ticker] started; Ctrl-C stops it, the 10s timeout caps it");
        let mut ticks = 0u32;
        while !ctx.is_shutdown() {
            ticks += 1;
            println!("[ticker] tick {ticks}");
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        println!("[ticker] shutdown observed after {ticks} ticks");
        Ok::<_, JobError>(())
    })
    .with_config_source(source);
    let job: JobRef = Arc::new(ticker);

    // 3. Run the whole lifecycle; the verdict becomes the exit code.
    Supervisor::run(job).await
}
