//! Node-manager lookups carried over synchronous bus RPCs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use edgealarm_common::routes::{module, Method, GET_IP_BY_SN, GET_SNS_BY_GROUP};
use edgealarm_common::status::{RespMsg, Status};
use edgealarm_engine::{DirectoryError, GroupMembers, NodeDirectory};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::bus::{BusError, Message, ModuleBus};
use crate::config::RpcConfig;

pub struct BusNodeDirectory {
    bus: Arc<ModuleBus>,
    group_timeout: Duration,
    ip_timeout: Duration,
}

impl BusNodeDirectory {
    pub fn new(bus: Arc<ModuleBus>, rpc: &RpcConfig) -> Self {
        Self {
            bus,
            group_timeout: Duration::from_millis(rpc.group_timeout_ms),
            ip_timeout: Duration::from_millis(rpc.ip_timeout_ms),
        }
    }

    async fn call<B: Serialize>(
        &self,
        method: &'static str,
        body: &B,
        timeout: Duration,
    ) -> Result<RespMsg, DirectoryError> {
        let req = Message::new(module::ALARM_MANAGER, module::NODE_MANAGER, Method::Get, method)
            .with_content(body)
            .map_err(|e| DirectoryError::Bus(e.to_string()))?;
        let resp = match self.bus.send_sync(req, timeout).await {
            Ok(resp) => resp,
            Err(BusError::Timeout { .. }) => {
                return Err(DirectoryError::Timeout {
                    method,
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Err(e) => return Err(DirectoryError::Bus(e.to_string())),
        };
        resp.parse_content::<RespMsg>()
            .map_err(|e| DirectoryError::Decode {
                method,
                reason: e.to_string(),
            })
    }
}

fn decode_data<T: DeserializeOwned>(method: &'static str, resp: RespMsg) -> Result<T, DirectoryError> {
    serde_json::from_value(resp.data).map_err(|e| DirectoryError::Decode {
        method,
        reason: e.to_string(),
    })
}

#[async_trait]
impl NodeDirectory for BusNodeDirectory {
    async fn sns_by_group(&self, group_id: u32) -> Result<GroupMembers, DirectoryError> {
        let resp = self
            .call(GET_SNS_BY_GROUP, &group_id, self.group_timeout)
            .await?;
        match resp.status {
            Status::Success => Ok(GroupMembers::Found(decode_data(GET_SNS_BY_GROUP, resp)?)),
            Status::ErrorNodeGroupNotFound => Ok(GroupMembers::NotFound),
            status => Err(DirectoryError::Status {
                method: GET_SNS_BY_GROUP,
                status,
                msg: resp.msg,
            }),
        }
    }

    async fn ip_by_sn(&self, serial: &str) -> Result<String, DirectoryError> {
        let resp = self.call(GET_IP_BY_SN, &serial, self.ip_timeout).await?;
        if !resp.is_success() {
            return Err(DirectoryError::Status {
                method: GET_IP_BY_SN,
                status: resp.status,
                msg: resp.msg,
            });
        }
        decode_data(GET_IP_BY_SN, resp)
    }
}
