mod common;

use anyhow::Result;
use chrono::{Datelike, Duration as ChronoDuration, Utc};
use common::build_test_context;
use edgealarm_common::types::{AlarmKind, Severity};
use edgealarm_server::janitor::Janitor;
use edgealarm_server::monitor::cert_overdue::{CertOverdueMonitor, IMAGE_CERT_ALARM_ID};
use edgealarm_server::monitor::MonitorScheduler;
use edgealarm_storage::{AlarmFilter, NewAlarm, SerialScope};
use std::sync::Arc;
use std::time::Duration;

fn pem_expiring_in(days: i64) -> Result<String> {
    let not_after = Utc::now() + ChronoDuration::days(days);
    let mut params = rcgen::CertificateParams::new(vec!["center.local".to_string()]);
    params.not_before = rcgen::date_time_ymd(2020, 1, 1);
    params.not_after =
        rcgen::date_time_ymd(not_after.year(), not_after.month() as u8, not_after.day() as u8);
    let cert = rcgen::Certificate::from_params(params)?;
    Ok(cert.serialize_pem()?)
}

fn record(serial: &str, alarm_id: &str) -> NewAlarm {
    NewAlarm {
        kind: AlarmKind::Alarm,
        created_at: Utc::now().fixed_offset(),
        serial_number: serial.to_string(),
        ip: "10.0.0.1".to_string(),
        alarm_id: alarm_id.to_string(),
        alarm_name: "Disk Usage".to_string(),
        severity: Severity::Major,
        detailed_information: String::new(),
        suggestion: String::new(),
        reason: String::new(),
        impact: String::new(),
        resource: "disk".to_string(),
    }
}

#[tokio::test]
async fn janitor_drops_edge_records_past_threshold() -> Result<()> {
    let ctx = build_test_context().await?;
    let store = ctx.app.state.store.clone();
    store.insert_alarm(&record("", "0x01000001")).await?;
    store.insert_alarm(&record("E1", "0x01000001")).await?;

    let janitor = Janitor::new(store.clone(), Duration::from_secs(3600), 3);
    assert_eq!(janitor.sweep_once().await?, None);

    store.insert_alarm(&record("E2", "0x01000001")).await?;
    assert_eq!(janitor.sweep_once().await?, Some(2));

    assert_eq!(store.count_all().await?, 1);
    let center = AlarmFilter::new(AlarmKind::Alarm, SerialScope::Center);
    assert_eq!(store.count_alarms(&center).await?, 1);
    Ok(())
}

#[tokio::test]
async fn cert_monitor_raises_and_clears_center_alarms() -> Result<()> {
    let ctx = build_test_context().await?;
    let dir = ctx.temp_dir.path();
    let north = dir.join("north.pem");
    let software = dir.join("software.pem");
    let image = dir.join("image.pem");
    std::fs::write(&software, pem_expiring_in(30)?)?;
    std::fs::write(&image, pem_expiring_in(-30)?)?;

    let mut cert_cfg = ctx.app.state.config.cert_monitor.clone();
    cert_cfg.north_cert = Some(north.display().to_string());
    cert_cfg.software_cert = Some(software.display().to_string());
    cert_cfg.image_cert = Some(image.display().to_string());

    let monitor = Arc::new(CertOverdueMonitor::new(
        ctx.app.state.store.clone(),
        ctx.app.state.reload_lock.clone(),
        &cert_cfg,
    ));
    let mut scheduler = MonitorScheduler::new(
        ctx.app.state.bus.clone(),
        ctx.app.state.config.host_ip.clone(),
        1,
        Duration::ZERO,
    );
    assert!(scheduler.register(monitor).await);

    let center = AlarmFilter::new(AlarmKind::Alarm, SerialScope::Center);
    scheduler.run_once().await;
    ctx.wait_for_count(&center, 2).await?;

    let open = ctx
        .app
        .state
        .store
        .lookup_open("", IMAGE_CERT_ALARM_ID)
        .await?;
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].perceived_severity, "CRITICAL");
    assert_eq!(open[0].ip, "10.0.0.254");

    // Operator rotates both certificates.
    std::fs::write(&software, pem_expiring_in(365)?)?;
    std::fs::write(&image, pem_expiring_in(365)?)?;
    scheduler.run_once().await;
    ctx.wait_for_count(&center, 0).await?;
    Ok(())
}
