//! # OS interrupt wiring.
//!
//! Translates process termination signals into the supervisor's interrupt
//! token. The supervisor never waits on the OS directly; it selects on the
//! token, which keeps the interrupt path drivable from tests.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal, often used for core dumps or hard stop)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use tokio_util::sync::CancellationToken;

/// Spawns a listener that cancels `interrupt` on the first termination
/// signal.
///
/// Registration failure is logged and leaves the token permanently
/// unfired; the run then ends by completion or timeout only.
pub(crate) fn listen(interrupt: CancellationToken) {
    tokio::spawn(async move {
        match wait_for_interrupt_signal().await {
            Ok(()) => {
                tracing::info!("interrupt signal received");
                interrupt.cancel();
            }
            Err(err) => tracing::warn!(error = %err, "signal listener registration failed"),
        }
    });
}

/// Waits for a termination signal; independent listeners per call.
#[cfg(unix)]
async fn wait_for_interrupt_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal; independent listeners per call.
#[cfg(not(unix))]
async fn wait_for_interrupt_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
