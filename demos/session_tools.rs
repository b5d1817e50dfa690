//! # Example: session_tools
//!
//! Drives the phases by hand and exercises the session pool plus the run
//! history helpers.
//!
//! Demonstrates how to:
//! - Embed the supervisor with explicit `init` / `start` / `close` calls.
//! - Register the master session from straps inside the job.
//! - Open, annotate, and seal a [`history`] record for the run.
//! - Tap the event bus from outside the run.
//!
//! Expects a MongoDB server on `localhost:27017` (see
//! `demos/config/sessions.toml`); without one the job reports the dial
//! failure and exits cleanly.
//!
//! ## Flow
//! ```text
//! Supervisor::init(job)
//!     ├─► start()
//!     │     └─► job: pool.startup ─► record_start ─► add_detail
//!     │               ─► acquire/collection probe/release ─► record_end
//!     └─► close()  (drains the pool again; already empty, still fine)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example session_tools
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use jobvisor::{history, ConfigSource, JobContext, JobFn, JobRef, Supervisor, MASTER_SESSION};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    std::env::set_var("JOBVISOR_SESSIONS_ENV", "sessions");

    // 1. The job does all database work through its context.
    let job: JobRef = Arc::new(
        JobFn::new("session-tools", |ctx: JobContext| async move {
            let pool = ctx.sessions();

            // Register the master session from the mongo_* straps.
            if let Err(e) = pool.startup("demo", ctx.straps()).await {
                println!("[session-tools] no database reachable, skipping: {e}");
                return Ok(());
            }
            println!(
                "[session-tools] sessions registered: {:?}",
                pool.names().await
            );

            // Leave an audit trail for this run.
            let record =
                history::record_start("demo", pool, MASTER_SESSION, "session-tools").await?;
            history::add_detail(
                "demo",
                pool,
                MASTER_SESSION,
                &record,
                "probe",
                "checking the records collection",
            )
            .await?;

            // Borrow a handle for direct driver work.
            let handle = pool.acquire("demo", MASTER_SESSION).await?;
            let present = handle
                .collection_exists("demo", handle.database_name(), history::RECORDS_COLLECTION)
                .await;
            println!(
                "[session-tools] {} present: {present}",
                history::RECORDS_COLLECTION
            );
            pool.release("demo", handle).await;

            history::record_end("demo", pool, MASTER_SESSION, &record, "success").await?;
            println!("[session-tools] record {} sealed", record.id);
            Ok(())
        })
        .with_config_source(ConfigSource::new("JOBVISOR_SESSIONS_ENV", "demos/config")),
    );

    // 2. Drive the phases explicitly instead of Supervisor::run.
    let mut sup = match Supervisor::init(job) {
        Ok(sup) => sup,
        Err(e) => {
            eprintln!("init failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    // 3. Watch the run from the outside through the bus tap.
    let mut tap = sup.bus().subscribe();
    let watcher = tokio::spawn(async move {
        while let Ok(event) = tap.recv().await {
            println!("[bus] {:?}", event.kind);
        }
    });

    let outcome = sup.start().await;
    if let Err(e) = sup.close().await {
        eprintln!("close failed: {e}");
    }
    watcher.abort();

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("run failed: {e}");
            ExitCode::FAILURE
        }
    }
}
