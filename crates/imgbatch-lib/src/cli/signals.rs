use crate::download::ShutdownController;
use tokio::task::JoinHandle;

/// Turn SIGINT (and SIGTERM on unix) into a shutdown request. Repeated
/// signals do not escalate: the batch in flight is always drained.
pub fn listen_for_shutdown_signals(shutdown: ShutdownController) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = wait_for_signal().await {
                tracing::error!("Failed to listen for shutdown signals: {}", e);
                return;
            }
            if shutdown.request() {
                tracing::info!("Interrupt signal received. Gracefully shutting down...");
            } else {
                tracing::warn!(
                    "Shutdown already in progress ({}), waiting for running downloads",
                    shutdown.state()
                );
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
