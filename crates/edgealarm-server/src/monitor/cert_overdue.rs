//! Expiry watch over the certificates imported on the center node.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edgealarm_common::types::{AlarmKind, AlarmReq, Notification, Severity};
use edgealarm_storage::AlarmStore;
use tokio::sync::{Mutex, RwLock};

use super::checker::{inspect, CertState};
use super::Monitor;
use crate::config::CertMonitorConfig;
use crate::runtime_seed::{CERT_OVERDUE_PERIOD_KEY, CERT_OVERDUE_THRESHOLD_KEY};

pub const NORTH_CERT_ALARM_ID: &str = "0x01000001";
pub const SOFTWARE_CERT_ALARM_ID: &str = "0x01000002";
pub const IMAGE_CERT_ALARM_ID: &str = "0x01000003";

const RESOURCE: &str = "cert";
const THRESHOLD_RANGE: std::ops::RangeInclusive<u64> = 7..=180;
const PERIOD_RANGE: std::ops::RangeInclusive<u64> = 1..=30;
const SECS_PER_DAY: u64 = 86_400;

/// One imported certificate and the alarm id it owns.
#[derive(Debug, Clone)]
pub struct CertSlot {
    pub alarm_id: &'static str,
    pub alarm_name: &'static str,
    pub path: Option<PathBuf>,
}

pub struct CertOverdueMonitor {
    store: Arc<AlarmStore>,
    reload_lock: Arc<Mutex<()>>,
    slots: Vec<CertSlot>,
    bundles: RwLock<Vec<Option<Vec<u8>>>>,
    threshold_days: AtomicI64,
}

impl CertOverdueMonitor {
    pub fn new(store: Arc<AlarmStore>, reload_lock: Arc<Mutex<()>>, config: &CertMonitorConfig) -> Self {
        let slots = vec![
            CertSlot {
                alarm_id: NORTH_CERT_ALARM_ID,
                alarm_name: "North Cert Abnormal",
                path: config.north_cert.as_ref().map(PathBuf::from),
            },
            CertSlot {
                alarm_id: SOFTWARE_CERT_ALARM_ID,
                alarm_name: "Software Repository Cert Abnormal",
                path: config.software_cert.as_ref().map(PathBuf::from),
            },
            CertSlot {
                alarm_id: IMAGE_CERT_ALARM_ID,
                alarm_name: "Image Repository Cert Abnormal",
                path: config.image_cert.as_ref().map(PathBuf::from),
            },
        ];
        let bundles = RwLock::new(vec![None; slots.len()]);
        Self {
            store,
            reload_lock,
            slots,
            bundles,
            threshold_days: AtomicI64::new(config.default_threshold_days as i64),
        }
    }

    async fn read_setting(&self, key: &str, range: std::ops::RangeInclusive<u64>) -> anyhow::Result<u64> {
        let row = self
            .store
            .get_config(key)
            .await?
            .with_context(|| format!("setting {key} is missing"))?;
        let value: u64 = row
            .config_value
            .trim()
            .parse()
            .with_context(|| format!("setting {key} is not a number: {}", row.config_value))?;
        if !range.contains(&value) {
            anyhow::bail!(
                "setting {key}={value} is outside [{}, {}]",
                range.start(),
                range.end()
            );
        }
        Ok(value)
    }

    /// Builds this tick's entries. Every slot yields exactly one entry so a
    /// recovered certificate clears its alarm on the next tick.
    pub async fn collect_at(&self, now: DateTime<Utc>) -> Vec<AlarmReq> {
        let threshold = self.threshold_days.load(Ordering::Relaxed);
        let bundles = self.bundles.read().await;
        self.slots
            .iter()
            .zip(bundles.iter())
            .map(|(slot, bundle)| {
                let state = inspect(bundle.as_deref(), now, threshold);
                entry_for(slot, &state, now, threshold)
            })
            .collect()
    }
}

fn entry_for(slot: &CertSlot, state: &CertState, now: DateTime<Utc>, threshold: i64) -> AlarmReq {
    let (severity, detail) = match state {
        CertState::Missing => (Severity::Ok, "certificate not imported".to_string()),
        CertState::Valid { days_left } => {
            (Severity::Ok, format!("certificate expires in {days_left} days"))
        }
        CertState::Unparseable(reason) => {
            (Severity::Major, format!("certificate cannot be parsed: {reason}"))
        }
        CertState::Expired => (Severity::Critical, "certificate has expired".to_string()),
        CertState::Expiring { days_left } => (
            Severity::Major,
            format!("certificate expires in {days_left} days, within the {threshold} day threshold"),
        ),
    };
    let notification = if state.is_ok() {
        Notification::Clear
    } else {
        Notification::Alarm
    };

    AlarmReq {
        alarm_type: AlarmKind::Alarm.to_string(),
        alarm_id: slot.alarm_id.to_string(),
        alarm_name: slot.alarm_name.to_string(),
        resource: RESOURCE.to_string(),
        perceived_severity: severity.to_string(),
        timestamp: now.to_rfc3339(),
        notification_type: notification.as_str().to_string(),
        detailed_information: detail.chars().take(256).collect(),
        suggestion: "import a valid certificate before the current one expires".to_string(),
        reason: "certificate is expired, expiring or damaged".to_string(),
        impact: "connections secured by this certificate may fail".to_string(),
    }
}

#[async_trait]
impl Monitor for CertOverdueMonitor {
    fn name(&self) -> &str {
        "cert-overdue"
    }

    async fn init(&self) -> anyhow::Result<Duration> {
        let threshold = self
            .read_setting(CERT_OVERDUE_THRESHOLD_KEY, THRESHOLD_RANGE)
            .await?;
        let period = self.read_setting(CERT_OVERDUE_PERIOD_KEY, PERIOD_RANGE).await?;
        self.threshold_days.store(threshold as i64, Ordering::Relaxed);
        Ok(Duration::from_secs(period * SECS_PER_DAY))
    }

    async fn reset(&self) -> anyhow::Result<()> {
        let _guard = self.reload_lock.lock().await;
        let mut fresh = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let bundle = match &slot.path {
                None => None,
                Some(path) => match tokio::fs::read(path).await {
                    Ok(bytes) => Some(bytes),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => {
                        tracing::warn!(
                            alarm_id = slot.alarm_id,
                            path = %path.display(),
                            error = %e,
                            "Failed to read certificate"
                        );
                        None
                    }
                },
            };
            fresh.push(bundle);
        }
        *self.bundles.write().await = fresh;
        Ok(())
    }

    async fn collect(&self) -> Vec<AlarmReq> {
        self.collect_at(Utc::now()).await
    }
}
