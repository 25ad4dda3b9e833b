//! # Cross-platform OS signal handling.
//!
//! Used by [`GenericHost`](crate::GenericHost) when built with
//! [`HostBuilder::with_os_signals`](crate::HostBuilder::with_os_signals):
//! the first signal requests application stop on the host's [`Lifetime`].
//!
//! ## Signals
//! **Unix platforms:** `SIGINT`, `SIGTERM`, `SIGQUIT`
//!
//! **Windows platforms:** `Ctrl-C` via [`tokio::signal::ctrl_c`]

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::Lifetime;

/// Waits for a termination signal.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Spawns a watcher that requests stop on `lifetime` when a signal arrives.
///
/// The watcher exits on its own once the lifetime is stopping.
pub(crate) fn spawn_signal_watcher(lifetime: Lifetime) -> JoinHandle<()> {
    let stopping: CancellationToken = lifetime.stopping();
    tokio::spawn(async move {
        tokio::select! {
            res = wait_for_shutdown_signal() => match res {
                Ok(()) => {
                    tracing::info!("termination signal received; stopping application");
                    lifetime.stop_application();
                }
                Err(e) => tracing::warn!(error = %e, "failed to register signal handlers"),
            },
            _ = stopping.cancelled() => {}
        }
    })
}
