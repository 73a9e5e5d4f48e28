use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response status codes distinguished by the alarm manager and the
/// node-manager RPCs it calls.
///
/// # Examples
///
/// ```
/// use edgealarm_common::status::Status;
///
/// let json = serde_json::to_string(&Status::Success).unwrap();
/// assert_eq!(json, "\"SUCCESS\"");
/// assert_eq!(Status::ErrorParamInvalid.as_str(), "ErrorParamInvalid");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "SUCCESS")]
    Success,
    ErrorParamConvert,
    ErrorParamInvalid,
    ErrorListAlarm,
    ErrorListCenterNodeAlarm,
    ErrorListEdgeNodeAlarm,
    ErrorListGroupAlarm,
    ErrorGetAlarmDetail,
    /// A store write on the report path failed. Reports have no caller, so
    /// this code only reaches the log.
    ErrorReportAlarm,
    ErrorDecodeRespFromEdgeMgr,
    ErrorNodeGroupNotFound,
    ErrorClearNodeAlarm,
    ErrorGetNode,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::ErrorParamConvert => "ErrorParamConvert",
            Status::ErrorParamInvalid => "ErrorParamInvalid",
            Status::ErrorListAlarm => "ErrorListAlarm",
            Status::ErrorListCenterNodeAlarm => "ErrorListCenterNodeAlarm",
            Status::ErrorListEdgeNodeAlarm => "ErrorListEdgeNodeAlarm",
            Status::ErrorListGroupAlarm => "ErrorListGroupAlarm",
            Status::ErrorGetAlarmDetail => "ErrorGetAlarmDetail",
            Status::ErrorReportAlarm => "ErrorReportAlarm",
            Status::ErrorDecodeRespFromEdgeMgr => "ErrorDecodeRespFromEdgeMgr",
            Status::ErrorNodeGroupNotFound => "ErrorNodeGroupNotFound",
            Status::ErrorClearNodeAlarm => "ErrorClearNodeAlarm",
            Status::ErrorGetNode => "ErrorGetNode",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result envelope carried in response message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespMsg {
    pub status: Status,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Value,
}

impl RespMsg {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            status: Status::Success,
            msg: String::new(),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    pub fn success_empty() -> Self {
        Self {
            status: Status::Success,
            msg: String::new(),
            data: Value::Null,
        }
    }

    pub fn error(status: Status, msg: impl Into<String>) -> Self {
        Self {
            status,
            msg: msg.into(),
            data: Value::Null,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
