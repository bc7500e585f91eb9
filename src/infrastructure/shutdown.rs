//! Graceful Shutdown Handler
//!
//! Resolves when the process is asked to stop, so the API server can finish
//! in-flight lookups before exiting.

/// Wait for Ctrl+C or SIGTERM.
///
/// If a handler cannot be installed that branch never fires; the other
/// signal still works.
#[cfg_attr(coverage_nightly, coverage(off))]
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating shutdown");
        }
    }
}
