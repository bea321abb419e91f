use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::policy::LimiterSet;

/// Periodic memory cleanup for a `LimiterSet`.
pub struct Sweeper {
    limiters: LimiterSet,
    interval: Duration,
}

/// Running sweeper. Dropping the handle also ends the task, but only `stop`
/// waits for it to finish.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Sweeper {
    pub fn new(limiters: LimiterSet, interval: Duration) -> Self {
        Self { limiters, interval }
    }

    /// Spawn onto the current tokio runtime.
    pub fn start(self) -> SweeperHandle {
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        SweeperHandle { shutdown: tx, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        // first tick fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("limiter sweeper shutdown");
                    return;
                }
                _ = ticker.tick() => {
                    let removed = self.limiters.sweep();
                    if removed > 0 {
                        tracing::debug!(removed, "limiter sweep");
                    }
                }
            }
        }
    }
}

impl SweeperHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("limiter sweeper join error: {}", e);
        }
    }
}
