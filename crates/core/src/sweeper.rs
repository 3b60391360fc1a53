//! Periodic eviction of expired intake records and abandoned selections.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::IntakeConfig;
use crate::intake::{IntakeQueue, SelectionStore};

/// Removes records and open selections older than the retention window on a
/// fixed period.
pub struct ExpirySweeper {
    queue: Arc<IntakeQueue>,
    selections: Option<Arc<SelectionStore>>,
    retention: chrono::Duration,
    interval: Duration,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ExpirySweeper {
    pub fn new(queue: Arc<IntakeQueue>, retention: Duration, interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            queue,
            selections: None,
            retention: chrono::Duration::from_std(retention)
                .unwrap_or_else(|_| chrono::Duration::MAX),
            interval,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn from_config(queue: Arc<IntakeQueue>, config: &IntakeConfig) -> Self {
        Self::new(
            queue,
            Duration::from_secs(config.retention_secs),
            Duration::from_secs(config.sweep_interval_secs),
        )
    }

    /// Also drop selections that were opened but never sent.
    pub fn with_selections(mut self, selections: Arc<SelectionStore>) -> Self {
        self.selections = Some(selections);
        self
    }

    pub fn retention(&self) -> chrono::Duration {
        self.retention
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one sweep at the queue clock's current time. Returns the number
    /// of records evicted.
    pub async fn tick(&self) -> usize {
        sweep_once(&self.queue, self.selections.as_deref(), self.retention).await
    }

    /// Start the sweep loop (spawns a background task).
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Expiry sweeper already running");
            return;
        }

        let queue = Arc::clone(&self.queue);
        let selections = self.selections.clone();
        let retention = self.retention;
        let interval = self.interval;
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!(
                interval_secs = interval.as_secs_f64(),
                retention_secs = retention.num_seconds(),
                "Expiry sweeper started"
            );
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Expiry sweeper received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        let evicted =
                            sweep_once(&queue, selections.as_deref(), retention).await;
                        debug!(evicted, "Sweep tick");
                    }
                }
            }
        });
    }

    /// Stop the sweep loop.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Expiry sweeper not running");
            return;
        }

        let _ = self.shutdown_tx.send(());
        info!("Expiry sweeper stopped");
    }
}

async fn sweep_once(
    queue: &IntakeQueue,
    selections: Option<&SelectionStore>,
    retention: chrono::Duration,
) -> usize {
    let now = queue.clock().now();
    let evicted = queue.sweep(now, retention).await;
    if let Some(selections) = selections {
        selections.sweep(now, retention).await;
    }
    evicted
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            let _ = self.shutdown_tx.send(());
        }
    }
}
