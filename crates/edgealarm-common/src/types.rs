use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Serial number of the center node (the aggregator itself).
pub const CENTER_SN: &str = "";

/// Upper bound of open alarms one node may hold.
pub const MAX_ALARM_PER_NODE: u64 = 20;

/// Size of the per-node event ring.
pub const MAX_EVENT_PER_NODE: u64 = 50;

/// Maximum number of entries carried by one report envelope.
pub const MAX_ALARMS_PER_REPORT: usize = 20;

/// Table-wide row count at which every non-center record is dropped.
pub const GLOBAL_CLEAR_THRESHOLD: u64 = 100_000;

/// Largest page a list query may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Whether a record is a stateful alarm or a log-like event.
///
/// # Examples
///
/// ```
/// use edgealarm_common::types::AlarmKind;
///
/// let kind: AlarmKind = "event".parse().unwrap();
/// assert_eq!(kind, AlarmKind::Event);
/// assert_eq!(AlarmKind::Alarm.to_string(), "alarm");
/// assert!("Alarm".parse::<AlarmKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmKind {
    Alarm,
    Event,
}

impl AlarmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmKind::Alarm => "alarm",
            AlarmKind::Event => "event",
        }
    }
}

impl std::fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlarmKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alarm" => Ok(AlarmKind::Alarm),
            "event" => Ok(AlarmKind::Event),
            _ => Err(format!("unknown alarm type: {s}")),
        }
    }
}

/// Perceived severity reported by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Minor,
    Major,
    Critical,
    Ok,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "MINOR",
            Severity::Major => "MAJOR",
            Severity::Critical => "CRITICAL",
            Severity::Ok => "OK",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MINOR" => Ok(Severity::Minor),
            "MAJOR" => Ok(Severity::Major),
            "CRITICAL" => Ok(Severity::Critical),
            "OK" => Ok(Severity::Ok),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Notification flag of a report entry. An empty flag behaves like `alarm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Clear,
    Alarm,
    Unset,
}

impl Notification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Notification::Clear => "clear",
            Notification::Alarm => "alarm",
            Notification::Unset => "",
        }
    }
}

impl std::str::FromStr for Notification {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clear" => Ok(Notification::Clear),
            "alarm" => Ok(Notification::Alarm),
            "" => Ok(Notification::Unset),
            _ => Err(format!("unknown notification type: {s}")),
        }
    }
}

/// One entry of a report envelope, exactly as the producer sent it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmReq {
    #[serde(rename = "type", default)]
    pub alarm_type: String,
    #[serde(default)]
    pub alarm_id: String,
    #[serde(default)]
    pub alarm_name: String,
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub perceived_severity: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub notification_type: String,
    #[serde(default)]
    pub detailed_information: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub impact: String,
}

/// Report envelope (`POST /edge/alarm/report`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlarmsReq {
    #[serde(rename = "serialNumber", default)]
    pub sn: String,
    #[serde(default)]
    pub ip: String,
    #[serde(rename = "alarm", default)]
    pub alarms: Vec<AlarmReq>,
}

/// Node-clear body (`DELETE /edge/alarm/node-clear`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClearNodeReq {
    #[serde(rename = "serialNumber", default)]
    pub sn: String,
}

/// Northbound list query for alarms or events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAlarmOrEventReq {
    #[serde(default)]
    pub page_num: i64,
    #[serde(default)]
    pub page_size: i64,
    #[serde(default)]
    pub sn: String,
    #[serde(default)]
    pub group_id: i64,
    #[serde(default)]
    pub if_center: String,
}

/// Short projection of a record used in list responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmDigest {
    pub id: u64,
    pub sn: String,
    pub ip: String,
    pub alarm_id: String,
    pub severity: String,
    pub resource: String,
    pub created_at: DateTime<FixedOffset>,
    #[serde(rename = "type")]
    pub alarm_type: String,
}

/// Full record returned by the detail routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmDetail {
    pub id: u64,
    #[serde(rename = "type")]
    pub alarm_type: String,
    pub created_at: DateTime<FixedOffset>,
    pub sn: String,
    pub ip: String,
    pub alarm_id: String,
    pub alarm_name: String,
    pub perceived_severity: String,
    pub detailed_information: String,
    pub suggestion: String,
    pub reason: String,
    pub impact: String,
    pub resource: String,
}

/// One page of a list query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmPage {
    pub total: u64,
    pub records: Vec<AlarmDigest>,
}
