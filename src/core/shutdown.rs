//! # Termination signals.
//!
//! [`wait_for_shutdown_signal`] resolves with the name of the first
//! termination signal the process receives.
//!
//! - unix: `SIGINT`, `SIGTERM` (systemd, Kubernetes), `SIGQUIT`, plus Ctrl-C
//! - elsewhere: Ctrl-C

/// Waits for a termination signal and returns its name.
///
/// Returns `Err` if a signal handler cannot be registered.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = tokio::signal::ctrl_c() => "ctrl_c",
        _ = sigint.recv()  => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for Ctrl-C.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl_c")
}
