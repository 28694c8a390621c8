//! Interrupt handling for the long-running loops

use std::future::Future;

use tracing::info;

use crate::error::Result;

/// Install the interrupt handlers and return a future that resolves on the
/// first Ctrl-C (or SIGTERM on unix).
///
/// Handlers are registered before this returns, so a signal arriving between
/// installation and the first poll is not lost. Must be called inside a tokio
/// runtime.
#[cfg(unix)]
pub fn shutdown_signal() -> Result<impl Future<Output = ()> + Send> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => info!("Received SIGINT"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
    })
}

#[cfg(not(unix))]
pub fn shutdown_signal() -> Result<impl Future<Output = ()> + Send> {
    Ok(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C");
        } else {
            std::future::pending::<()>().await;
        }
    })
}
