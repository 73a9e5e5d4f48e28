#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use edgealarm_common::routes::{
    module, Method, CLEAR_NODE_ALARM, GET_IP_BY_SN, GET_SNS_BY_GROUP, REPORT_ALARM,
};
use edgealarm_common::status::{RespMsg, Status};
use edgealarm_common::types::{AlarmPage, AlarmReq, AlarmsReq, ClearNodeReq, ListAlarmOrEventReq};
use edgealarm_server::app::{self, App};
use edgealarm_server::bus::{Message, ModuleBus, Peer};
use edgealarm_server::config::ServerConfig;
use edgealarm_server::peer::lane_index;
use edgealarm_storage::AlarmFilter;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};

pub struct TestContext {
    pub temp_dir: TempDir,
    pub app: App,
    /// Mailbox of the northbound service; receives answers to sync messages
    /// delivered through the transport.
    responses: Mutex<mpsc::Receiver<Message>>,
}

pub fn test_config(temp_dir: &TempDir) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.database.data_dir = temp_dir.path().to_string_lossy().to_string();
    config.host_ip = "10.0.0.254".to_string();
    config.lanes = 4;
    config.rpc.group_timeout_ms = 1000;
    config.rpc.ip_timeout_ms = 1000;
    config.janitor.enabled = false;
    config.cert_monitor.enabled = false;
    config
}

pub async fn build_test_context() -> Result<TestContext> {
    edgealarm_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let state = app::build_state(test_config(&temp_dir)).await?;
    spawn_fake_node_manager(state.bus.clone()).await?;
    let responses = state.bus.register(module::RESTFUL_SERVICE).await?;
    let app = app::start(state).await?;

    Ok(TestContext {
        temp_dir,
        app,
        responses: Mutex::new(responses),
    })
}

/// Node manager stand-in: group 7 holds E1 and E2, group 8 is empty, every
/// other group is unknown. E1 and E2 have known addresses.
pub async fn spawn_fake_node_manager(bus: Arc<ModuleBus>) -> Result<()> {
    let mut rx = bus.register(module::NODE_MANAGER).await?;
    tokio::spawn(async move {
        while let Some(req) = rx.recv().await {
            let body = match req.route.resource.as_str() {
                GET_SNS_BY_GROUP => match req.parse_content::<u32>() {
                    Ok(7) => RespMsg::success(vec!["E1", "E2"]),
                    Ok(8) => RespMsg::success(Vec::<String>::new()),
                    _ => RespMsg::error(Status::ErrorNodeGroupNotFound, "group not found"),
                },
                GET_IP_BY_SN => match req.parse_content::<String>().as_deref() {
                    Ok("E1") => RespMsg::success("10.0.0.1"),
                    Ok("E2") => RespMsg::success("10.0.0.2"),
                    _ => RespMsg::error(Status::ErrorGetNode, "node not found"),
                },
                _ => continue,
            };
            let Ok(resp) = req.new_response().with_content(&body) else {
                continue;
            };
            let _ = bus.send(resp).await;
        }
    });
    Ok(())
}

pub fn peer(serial: &str, ip: &str) -> Peer {
    Peer {
        serial: serial.to_string(),
        ip: ip.to_string(),
    }
}

/// Producer timestamp `secs` seconds after 2024-01-01T00:00:00Z.
pub fn ts(secs: i64) -> String {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (base + ChronoDuration::seconds(secs)).to_rfc3339()
}

pub fn alarm_entry(alarm_id: &str, notification: &str, timestamp: &str) -> AlarmReq {
    AlarmReq {
        alarm_type: "alarm".to_string(),
        alarm_id: alarm_id.to_string(),
        alarm_name: "ImageCert".to_string(),
        resource: "cert".to_string(),
        perceived_severity: "MAJOR".to_string(),
        timestamp: timestamp.to_string(),
        notification_type: notification.to_string(),
        detailed_information: "image repository certificate is about to expire".to_string(),
        suggestion: "import a new certificate".to_string(),
        reason: "certificate expiring".to_string(),
        impact: "image pulls may fail".to_string(),
    }
}

pub fn event_entry(alarm_id: &str, timestamp: &str) -> AlarmReq {
    AlarmReq {
        alarm_type: "event".to_string(),
        alarm_id: alarm_id.to_string(),
        alarm_name: "Container Restarted".to_string(),
        resource: "pod".to_string(),
        perceived_severity: "MINOR".to_string(),
        timestamp: timestamp.to_string(),
        notification_type: String::new(),
        ..Default::default()
    }
}

pub fn report_message(body: &AlarmsReq) -> Result<Message> {
    Ok(Message::new(module::PEER_ADAPTER, module::ALARM_MANAGER, Method::Post, REPORT_ALARM)
        .with_content(body)?)
}

impl TestContext {
    /// Delivers a report through the transport as the attested `peer`. The
    /// body carries the same identity.
    pub fn report(&self, serial: &str, ip: &str, alarms: Vec<AlarmReq>) -> Result<()> {
        let body = AlarmsReq {
            sn: serial.to_string(),
            ip: ip.to_string(),
            alarms,
        };
        self.deliver(report_message(&body)?.with_peer(peer(serial, ip)))
    }

    pub fn deliver(&self, msg: Message) -> Result<()> {
        if !self.app.transport.deliver(msg) {
            bail!("transport inbox closed");
        }
        Ok(())
    }

    /// Returns once every transport message for `serial` delivered so far
    /// has been processed. A sync node-clear for another serial sharing the
    /// lane acts as the barrier.
    pub async fn flush(&self, serial: &str) -> Result<()> {
        let lanes = self.app.state.config.lane_count();
        let target = lane_index(serial, lanes);
        let barrier = (0..)
            .map(|n| format!("barrier{n}"))
            .find(|candidate| candidate != serial && lane_index(candidate, lanes) == target)
            .ok_or_else(|| anyhow!("no barrier serial"))?;

        let mut msg = Message::new(
            module::RESTFUL_SERVICE,
            module::ALARM_MANAGER,
            Method::Delete,
            CLEAR_NODE_ALARM,
        )
        .with_content(&ClearNodeReq { sn: barrier })?;
        msg.header.is_sync = true;
        let id = msg.header.id.clone();
        self.deliver(msg)?;

        let mut responses = self.responses.lock().await;
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let resp = tokio::time::timeout(remaining, responses.recv())
                .await
                .map_err(|_| anyhow!("flush of {serial} timed out"))?
                .ok_or_else(|| anyhow!("response mailbox closed"))?;
            if resp.header.parent_id.as_deref() == Some(id.as_str()) {
                let body: RespMsg = resp.parse_content()?;
                assert_ok_envelope(&body);
                return Ok(());
            }
        }
    }

    /// Sync request from the northbound service.
    pub async fn request<T: Serialize + ?Sized>(
        &self,
        method: Method,
        resource: &str,
        body: &T,
    ) -> Result<RespMsg> {
        let msg = Message::new(module::RESTFUL_SERVICE, module::ALARM_MANAGER, method, resource)
            .with_content(body)?;
        let resp = self
            .app
            .state
            .bus
            .send_sync(msg, Duration::from_secs(5))
            .await?;
        Ok(resp.parse_content()?)
    }

    pub async fn list(&self, resource: &str, req: &ListAlarmOrEventReq) -> Result<RespMsg> {
        self.request(Method::Get, resource, req).await
    }

    pub async fn list_page(&self, resource: &str, req: &ListAlarmOrEventReq) -> Result<AlarmPage> {
        let resp = self.list(resource, req).await?;
        assert_ok_envelope(&resp);
        Ok(serde_json::from_value(resp.data)?)
    }

    pub async fn count(&self, filter: &AlarmFilter) -> Result<u64> {
        Ok(self.app.state.store.count_alarms(filter).await?)
    }

    /// Polls the store until `filter` matches `expected` rows.
    pub async fn wait_for_count(&self, filter: &AlarmFilter, expected: u64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let n = self.count(filter).await?;
            if n == expected {
                return Ok(());
            }
            if Instant::now() > deadline {
                bail!("count stuck at {n}, expected {expected}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

pub fn by_serial(sn: &str, page_size: i64) -> ListAlarmOrEventReq {
    ListAlarmOrEventReq {
        page_num: 1,
        page_size,
        sn: sn.to_string(),
        if_center: "false".to_string(),
        ..Default::default()
    }
}

pub fn by_group(group_id: i64, page_size: i64) -> ListAlarmOrEventReq {
    ListAlarmOrEventReq {
        page_num: 1,
        page_size,
        group_id,
        if_center: "false".to_string(),
        ..Default::default()
    }
}

pub fn assert_ok_envelope(resp: &RespMsg) {
    assert_eq!(resp.status, Status::Success, "unexpected envelope: {resp:?}");
}
