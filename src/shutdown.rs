//! Process signal handling.

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Wait for shutdown signal (SIGTERM or Ctrl+C).
///
/// This function will block until one of the following signals is received:
/// - `SIGTERM` (Unix/Linux only)
/// - `SIGINT` (Ctrl+C on all platforms)
///
/// If a handler cannot be installed, that signal is never observed.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}

/// Cancel `token` on the first shutdown signal.
///
/// The pipeline stops taking work as soon as the token fires; an in-flight
/// transcode is stopped and its input left in `queue/`.
#[must_use]
pub fn cancel_on_signal(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            () = shutdown_signal() => {
                println!("Interrupted!");
                token.cancel();
            }
            () = token.cancelled() => {}
        }
    })
}
