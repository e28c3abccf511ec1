use crate::utils::fmt_duration;
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = ?e, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = ?e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl+c"),
        _ = terminate => info!("received SIGTERM"),
    }
}

/// Wait for a shutdown signal (or the task ending on its own), then tell the
/// task to stop and give it `timeout` to finish.
pub async fn handle_shutdown_signals(
    mut task: JoinHandle<()>,
    shutdown_tx: broadcast::Sender<()>,
    timeout: Duration,
) -> ExitCode {
    tokio::select! {
        _ = shutdown_signal() => {}
        result = &mut task => {
            return match result {
                Ok(()) => {
                    warn!("monitor exited without a shutdown signal");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!(error = ?e, "monitor task panicked");
                    ExitCode::FAILURE
                }
            };
        }
    }

    // No receivers left means the task is already on its way out.
    let _ = shutdown_tx.send(());

    let start = std::time::Instant::now();
    match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(())) => {
            info!(duration = fmt_duration(start.elapsed()), "graceful shutdown complete");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!(error = ?e, "monitor task failed during shutdown");
            ExitCode::FAILURE
        }
        Err(_) => {
            warn!(timeout = fmt_duration(timeout), "shutdown timed out, aborting");
            task.abort();
            ExitCode::FAILURE
        }
    }
}
