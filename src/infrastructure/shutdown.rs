//! Graceful Shutdown Handler
//!
//! Signals shutdown to the scrape server and any other long-running task.

use std::sync::Arc;
use tokio::sync::watch;

/// Shutdown flag shared by the signal handler and the scrape server.
#[derive(Clone)]
pub struct ShutdownController {
    initiated: Arc<watch::Sender<bool>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (initiated, _) = watch::channel(false);
        Self {
            initiated: Arc::new(initiated),
        }
    }

    /// Initiate graceful shutdown. Later calls are no-ops.
    pub fn shutdown(&self) {
        if !self.initiated.send_replace(true) {
            tracing::info!("initiating graceful shutdown");
        }
    }

    /// Resolve once shutdown has been initiated, including before the call.
    pub async fn wait(&self) {
        let mut rx = self.initiated.subscribe();
        let _ = rx.wait_for(|initiated| *initiated).await;
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Install signal handlers for graceful shutdown.
///
/// Returns a future that completes when a shutdown signal is received.
#[cfg_attr(coverage_nightly, coverage(off))]
pub async fn shutdown_signal(controller: ShutdownController) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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

    controller.shutdown();
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn resolves(controller: &ShutdownController) -> bool {
        tokio::time::timeout(Duration::from_millis(50), controller.wait())
            .await
            .is_ok()
    }

    #[tokio::test]
    async fn test_wait_pending_until_shutdown() {
        let controller = ShutdownController::default();
        assert!(!resolves(&controller).await);
    }

    #[tokio::test]
    async fn test_wait_after_shutdown_returns() {
        let controller = ShutdownController::new();
        controller.shutdown();
        assert!(resolves(&controller).await);

        // Idempotent
        controller.shutdown();
        assert!(resolves(&controller).await);
    }

    #[tokio::test]
    async fn test_wait_resolves_on_shutdown() {
        let controller = ShutdownController::new();
        let waiter = {
            let c = controller.clone();
            tokio::spawn(async move { c.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.shutdown();

        let result = tokio::time::timeout(Duration::from_millis(200), waiter).await;
        assert!(result.is_ok());
    }
}
