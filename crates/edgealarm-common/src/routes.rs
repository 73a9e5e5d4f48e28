use serde::{Deserialize, Serialize};

/// Request verb carried in a message route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const LIST_ALARMS: &str = "/alarmmanager/v1/alarms";
pub const LIST_EVENTS: &str = "/alarmmanager/v1/events";
pub const ALARM_DETAIL: &str = "/alarmmanager/v1/alarm";
pub const EVENT_DETAIL: &str = "/alarmmanager/v1/event";
pub const REPORT_ALARM: &str = "/edge/alarm/report";
pub const CLEAR_NODE_ALARM: &str = "/edge/alarm/node-clear";

/// Node-manager RPC resources.
pub const GET_SNS_BY_GROUP: &str = "GetSnsByGroup";
pub const GET_IP_BY_SN: &str = "GetIpBySn";

/// Bus module names.
pub mod module {
    pub const ALARM_MANAGER: &str = "AlarmManager";
    pub const NODE_MANAGER: &str = "NodeManager";
    pub const PEER_ADAPTER: &str = "PeerAdapter";
    pub const MONITOR_SCHEDULER: &str = "MonitorScheduler";
    pub const RESTFUL_SERVICE: &str = "RestfulService";
}
