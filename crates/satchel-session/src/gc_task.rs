//! Background garbage collection for session stores

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use satchel_core::SessionStore;

/// How often to sweep, and what counts as expired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcSchedule {
    pub interval: Duration,
    /// Records idle longer than this many seconds are removed
    pub max_lifetime: u64,
}

impl Default for GcSchedule {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            max_lifetime: crate::options::DEFAULT_GC_MAXLIFETIME,
        }
    }
}

/// Handle for a running gc task
pub struct GcTask {
    shutdown_tx: tokio::sync::mpsc::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl GcTask {
    /// Signal the gc task to shut down and wait for it to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.handle.await;
    }
}

/// Spawn a background task that runs `store.gc` on a fixed schedule
///
/// The store must already be open. Failed sweeps are logged and retried on
/// the next tick.
pub fn spawn_gc_task(store: Arc<dyn SessionStore>, schedule: GcSchedule) -> GcTask {
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);

    let handle = tokio::spawn(async move {
        tracing::info!(
            "Starting session gc task (interval: {:?}, max lifetime: {}s)",
            schedule.interval,
            schedule.max_lifetime
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Session gc task shutting down");
                    break;
                }
                _ = sleep(schedule.interval) => {
                    match store.gc(schedule.max_lifetime).await {
                        Ok(stats) => {
                            if stats.removed > 0 || stats.failed > 0 {
                                tracing::info!(
                                    "Gc cycle: {} removed, {} failed",
                                    stats.removed,
                                    stats.failed
                                );
                            }
                        }
                        Err(e) => {
                            tracing::error!("Session gc task failed: {}", e);
                        }
                    }
                }
            }
        }
    });

    GcTask {
        shutdown_tx,
        handle,
    }
}
