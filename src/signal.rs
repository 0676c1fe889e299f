//! # OS signal handling for supervisor shutdown.
//!
//! [`trip_on_shutdown_signal`] bridges OS termination signals into the
//! supervisor's cancellation hierarchy: when a signal arrives, the given stop
//! token is tripped, which cancels every group's run token and drives all
//! supervisors to Terminal.
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

/// Waits for a termination signal, then trips `stop`.
///
/// Each call creates independent signal listeners. If signal registration
/// fails, `stop` is tripped immediately so a supervisor is never left
/// unreachable by Ctrl-C, and the error is returned to the caller.
pub async fn trip_on_shutdown_signal(stop: CancellationToken) -> std::io::Result<()> {
    let result = wait_for_shutdown_signal().await;
    stop.cancel();
    result
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
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

/// Waits for a termination signal.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
