//! OS signal handling.
//!
//! Ctrl+C (SIGINT) is translated into a [`Shutdown`] trigger. If the handler
//! cannot be installed the process keeps running and can still be stopped
//! through the coordinator.

use crate::lifecycle::Shutdown;

/// Spawn a task that triggers `shutdown` on Ctrl+C.
pub fn forward_ctrl_c(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                shutdown.trigger();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            }
        }
    })
}
