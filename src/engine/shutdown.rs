use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::signal;
use tracing::{info, warn};

/// Cooperative stop request shared between the signal handler and the engine.
///
/// The engine checks it between steps; a step that has already started always
/// runs to completion.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    shutdown: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Request a stop
    pub fn trigger(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Watch for Ctrl+C / SIGTERM in the background and trigger on the first one
    pub fn wait_for_signal(&self) {
        let signal_handle = self.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl+C: {}", e);
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
                        warn!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {},
                _ = terminate => {},
            }

            info!("Stop requested, finishing the current migration step");
            signal_handle.trigger();
        });
    }
}
