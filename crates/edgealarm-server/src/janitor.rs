use std::sync::Arc;
use std::time::Duration;

use edgealarm_storage::AlarmStore;
use tokio::sync::watch;
use tokio::time::interval;

/// Periodic safety valve on the total row count. Crossing the threshold
/// drops every edge record; the center's own alarms survive.
pub struct Janitor {
    store: Arc<AlarmStore>,
    interval: Duration,
    threshold: u64,
}

impl Janitor {
    pub fn new(store: Arc<AlarmStore>, interval: Duration, threshold: u64) -> Self {
        Self {
            store,
            interval,
            threshold,
        }
    }

    /// One check. Returns the number of removed rows when a global clear ran.
    pub async fn sweep_once(&self) -> anyhow::Result<Option<u64>> {
        let total = self.store.count_all().await?;
        if total < self.threshold {
            return Ok(None);
        }
        let removed = self.store.truncate_non_center().await?;
        tracing::error!(
            total,
            threshold = self.threshold,
            removed,
            "Alarm table reached the global threshold, cleared all edge node records"
        );
        Ok(Some(removed))
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            threshold = self.threshold,
            "Alarm janitor started"
        );

        let mut tick = interval(self.interval);
        // The first tick fires immediately; the table was just truncated.
        tick.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tick.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        tracing::error!(error = %e, "Alarm janitor sweep failed");
                    }
                }
            }
        }
        tracing::info!("Alarm janitor stopped");
    }
}
