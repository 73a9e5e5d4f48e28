//! Periodic producers of center-originated alarms.
//!
//! Every monitor tick ends in one report envelope with the center serial,
//! sent over the bus into the same ingestion path edge reports take.

pub mod cert_overdue;
pub mod checker;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use edgealarm_common::routes::{module, Method, REPORT_ALARM};
use edgealarm_common::types::{AlarmReq, AlarmsReq, CENTER_SN};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::interval;

use crate::bus::{Message, ModuleBus};

#[async_trait]
pub trait Monitor: Send + Sync {
    fn name(&self) -> &str;

    /// Loads settings and returns the tick period.
    async fn init(&self) -> anyhow::Result<Duration>;

    /// Runs at the top of every tick.
    async fn reset(&self) -> anyhow::Result<()>;

    async fn collect(&self) -> Vec<AlarmReq>;
}

struct Registered {
    monitor: Arc<dyn Monitor>,
    period: Duration,
}

pub struct MonitorScheduler {
    bus: Arc<ModuleBus>,
    host_ip: String,
    retries: u32,
    backoff: Duration,
    monitors: Vec<Registered>,
}

impl MonitorScheduler {
    pub fn new(bus: Arc<ModuleBus>, host_ip: String, retries: u32, backoff: Duration) -> Self {
        Self {
            bus,
            host_ip,
            retries,
            backoff,
            monitors: Vec::new(),
        }
    }

    /// Initializes `monitor`, retrying with backoff. A monitor that never
    /// initializes is skipped; the others still run.
    pub async fn register(&mut self, monitor: Arc<dyn Monitor>) -> bool {
        let attempts = self.retries.max(1);
        for attempt in 1..=attempts {
            match monitor.init().await {
                Ok(period) => {
                    tracing::info!(
                        monitor = monitor.name(),
                        period_secs = period.as_secs(),
                        "Monitor registered"
                    );
                    self.monitors.push(Registered { monitor, period });
                    return true;
                }
                Err(e) => {
                    tracing::warn!(
                        monitor = monitor.name(),
                        attempt,
                        attempts,
                        error = %e,
                        "Monitor init failed"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }
        tracing::error!(monitor = monitor.name(), "Monitor registration abandoned");
        false
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Ticks every registered monitor once.
    pub async fn run_once(&self) {
        for registered in &self.monitors {
            tick(&self.bus, &self.host_ip, registered.monitor.as_ref()).await;
        }
    }

    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        if self.monitors.is_empty() {
            tracing::info!("No monitors registered");
            return;
        }

        let mut loops = JoinSet::new();
        for Registered { monitor, period } in self.monitors {
            let bus = self.bus.clone();
            let host_ip = self.host_ip.clone();
            let mut shutdown = shutdown.clone();
            loops.spawn(async move {
                let mut timer = interval(period);
                loop {
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = timer.tick() => tick(&bus, &host_ip, monitor.as_ref()).await,
                    }
                }
                tracing::info!(monitor = monitor.name(), "Monitor stopped");
            });
        }
        while let Some(joined) = loops.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Monitor task failed");
            }
        }
    }
}

async fn tick(bus: &ModuleBus, host_ip: &str, monitor: &dyn Monitor) {
    if let Err(e) = monitor.reset().await {
        tracing::warn!(monitor = monitor.name(), error = %e, "Monitor reset failed");
    }
    let alarms = monitor.collect().await;
    if alarms.is_empty() {
        return;
    }

    let count = alarms.len();
    let report = AlarmsReq {
        sn: CENTER_SN.to_string(),
        ip: host_ip.to_string(),
        alarms,
    };
    let msg = match Message::new(
        module::MONITOR_SCHEDULER,
        module::ALARM_MANAGER,
        Method::Post,
        REPORT_ALARM,
    )
    .with_content(&report)
    {
        Ok(msg) => msg,
        Err(e) => {
            tracing::error!(monitor = monitor.name(), error = %e, "Failed to encode monitor report");
            return;
        }
    };
    match bus.send(msg).await {
        Ok(()) => tracing::debug!(monitor = monitor.name(), count, "Monitor report sent"),
        Err(e) => tracing::error!(monitor = monitor.name(), error = %e, "Failed to send monitor report"),
    }
}
