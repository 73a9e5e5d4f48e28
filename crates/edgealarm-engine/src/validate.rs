//! Structural checks applied once to every inbound report and query.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use edgealarm_common::types::{
    AlarmKind, AlarmReq, AlarmsReq, ClearNodeReq, ListAlarmOrEventReq, Notification, Severity,
    MAX_ALARMS_PER_REPORT, MAX_PAGE_SIZE,
};
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{AlarmError, Result};

static SERIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([-_a-zA-Z0-9]{0,62}[a-zA-Z0-9])?$").expect("valid serial regex")
});
static ALARM_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x0[0-9a-f]{7}$").expect("valid alarm id regex"));
static ALARM_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_ \-]{0,64}$").expect("valid alarm name regex"));
static RESOURCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_ \-]{0,256}$").expect("valid resource regex"));

const MAX_DETAIL_LEN: usize = 256;
const MAX_SUGGESTION_LEN: usize = 512;
const MAX_REASON_LEN: usize = 256;
const MAX_IMPACT_LEN: usize = 256;

/// A report entry that passed validation, with enums and the timestamp
/// already parsed.
#[derive(Debug, Clone)]
pub struct ValidatedAlarm {
    pub kind: AlarmKind,
    pub notification: Notification,
    pub alarm_id: String,
    pub alarm_name: String,
    pub resource: String,
    pub severity: Severity,
    pub created_at: DateTime<FixedOffset>,
    pub detailed_information: String,
    pub suggestion: String,
    pub reason: String,
    pub impact: String,
}

#[derive(Debug, Clone)]
pub struct ValidatedReport {
    pub serial: String,
    pub ip: String,
    pub alarms: Vec<ValidatedAlarm>,
}

/// Query scope selected by `ifCenter`, `sn` and `groupId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryScope {
    Center,
    BySerial(String),
    ByGroup(u32),
    AllEdge,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    pub page_num: u64,
    pub page_size: u64,
    pub scope: QueryScope,
}

/// Decodes JSON message content. Any shape mismatch is a conversion error.
pub fn decode<T: DeserializeOwned>(content: &[u8]) -> Result<T> {
    serde_json::from_slice(content).map_err(|e| AlarmError::ParamConvert(e.to_string()))
}

/// `true` for the center serial (empty) or a well-formed node serial.
///
/// # Examples
///
/// ```
/// use edgealarm_engine::validate::is_valid_serial;
///
/// assert!(is_valid_serial(""));
/// assert!(is_valid_serial("2102312NSF10K8000130"));
/// assert!(is_valid_serial("edge-01_a"));
/// assert!(!is_valid_serial("-edge"));
/// assert!(!is_valid_serial("edge 01"));
/// ```
pub fn is_valid_serial(serial: &str) -> bool {
    serial.is_empty() || SERIAL_RE.is_match(serial)
}

fn invalid(msg: impl Into<String>) -> AlarmError {
    AlarmError::ParamInvalid(msg.into())
}

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(invalid(format!("{field} exceeds {max} characters")));
    }
    Ok(())
}

fn validate_alarm(req: &AlarmReq) -> Result<ValidatedAlarm> {
    let kind: AlarmKind = req
        .alarm_type
        .parse()
        .map_err(|_| invalid(format!("unsupported type [{}]", req.alarm_type)))?;
    if !ALARM_ID_RE.is_match(&req.alarm_id) {
        return Err(invalid("alarmId is invalid"));
    }
    if !ALARM_NAME_RE.is_match(&req.alarm_name) {
        return Err(invalid("alarmName is invalid"));
    }
    if !RESOURCE_RE.is_match(&req.resource) {
        return Err(invalid("resource is invalid"));
    }
    let severity: Severity = req
        .perceived_severity
        .parse()
        .map_err(|_| invalid(format!("unsupported perceivedSeverity [{}]", req.perceived_severity)))?;
    let notification: Notification = req
        .notification_type
        .parse()
        .map_err(|_| invalid(format!("unsupported notificationType [{}]", req.notification_type)))?;
    check_len("detailedInformation", &req.detailed_information, MAX_DETAIL_LEN)?;
    check_len("suggestion", &req.suggestion, MAX_SUGGESTION_LEN)?;
    check_len("reason", &req.reason, MAX_REASON_LEN)?;
    check_len("impact", &req.impact, MAX_IMPACT_LEN)?;
    let created_at = DateTime::parse_from_rfc3339(&req.timestamp)
        .map_err(|e| invalid(format!("timestamp is not RFC3339: {e}")))?;

    Ok(ValidatedAlarm {
        kind,
        notification,
        alarm_id: req.alarm_id.clone(),
        alarm_name: req.alarm_name.clone(),
        resource: req.resource.clone(),
        severity,
        created_at,
        detailed_information: req.detailed_information.clone(),
        suggestion: req.suggestion.clone(),
        reason: req.reason.clone(),
        impact: req.impact.clone(),
    })
}

/// Checks a whole report envelope. One bad entry rejects the envelope.
pub fn validate_report(req: &AlarmsReq) -> Result<ValidatedReport> {
    if !is_valid_serial(&req.sn) {
        return Err(invalid("unsupported serial number received"));
    }
    if req.ip.parse::<Ipv4Addr>().is_err() {
        return Err(invalid("unsupported ip received"));
    }
    if req.alarms.len() > MAX_ALARMS_PER_REPORT {
        return Err(invalid(format!(
            "alarm request exceeds the max count {MAX_ALARMS_PER_REPORT}"
        )));
    }
    let alarms = req
        .alarms
        .iter()
        .map(validate_alarm)
        .collect::<Result<Vec<_>>>()?;
    Ok(ValidatedReport {
        serial: req.sn.clone(),
        ip: req.ip.clone(),
        alarms,
    })
}

/// Checks a node-clear body and returns the serial to clear.
pub fn validate_clear_node(req: &ClearNodeReq) -> Result<String> {
    if !is_valid_serial(&req.sn) {
        return Err(invalid("unsupported serial number received"));
    }
    Ok(req.sn.clone())
}

/// Checks a list query and resolves its scope.
///
/// # Examples
///
/// ```
/// use edgealarm_common::types::ListAlarmOrEventReq;
/// use edgealarm_engine::validate::{validate_query, QueryScope};
///
/// let req = ListAlarmOrEventReq {
///     page_num: 1,
///     page_size: 10,
///     group_id: 7,
///     if_center: "false".into(),
///     ..Default::default()
/// };
/// let query = validate_query(&req).unwrap();
/// assert_eq!(query.scope, QueryScope::ByGroup(7));
/// ```
pub fn validate_query(req: &ListAlarmOrEventReq) -> Result<ValidatedQuery> {
    if req.page_num < 1 || req.page_num > i64::from(i32::MAX) {
        return Err(invalid("pageNum is out of range"));
    }
    if req.page_size < 1 || req.page_size > MAX_PAGE_SIZE {
        return Err(invalid("pageSize is out of range"));
    }
    if !is_valid_serial(&req.sn) {
        return Err(invalid("sn is invalid"));
    }
    let group_id =
        u32::try_from(req.group_id).map_err(|_| invalid("groupId is out of range"))?;
    if !matches!(req.if_center.as_str(), "true" | "false" | "") {
        return Err(invalid("ifCenter must be true, false or empty"));
    }
    if req.if_center != "true" && !req.sn.is_empty() && group_id != 0 {
        return Err(invalid("sn and groupId cannot be given together"));
    }

    let scope = if req.if_center == "true" {
        QueryScope::Center
    } else if req.sn.is_empty() && group_id == 0 {
        if req.if_center.is_empty() {
            QueryScope::All
        } else {
            QueryScope::AllEdge
        }
    } else if !req.sn.is_empty() {
        QueryScope::BySerial(req.sn.clone())
    } else {
        QueryScope::ByGroup(group_id)
    };

    Ok(ValidatedQuery {
        page_num: req.page_num as u64,
        page_size: req.page_size as u64,
        scope,
    })
}

/// Decodes a detail request id: an unsigned integer in `[1, i64::MAX]`.
pub fn parse_detail_id(content: &[u8]) -> Result<u64> {
    let id: u64 = decode(content)?;
    if id == 0 || id > i64::MAX as u64 {
        return Err(invalid(format!("id[{id}] is out of range")));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alarm() -> AlarmReq {
        AlarmReq {
            alarm_type: "alarm".into(),
            alarm_id: "0x01000003".into(),
            alarm_name: "Image Repository Cert Abnormal".into(),
            resource: "cert".into(),
            perceived_severity: "MAJOR".into(),
            timestamp: "2024-01-01T00:00:00Z".into(),
            notification_type: "alarm".into(),
            ..Default::default()
        }
    }

    fn report(alarms: Vec<AlarmReq>) -> AlarmsReq {
        AlarmsReq {
            sn: "E1".into(),
            ip: "10.0.0.1".into(),
            alarms,
        }
    }

    fn query(page_num: i64, page_size: i64, sn: &str, group_id: i64, if_center: &str) -> ListAlarmOrEventReq {
        ListAlarmOrEventReq {
            page_num,
            page_size,
            sn: sn.into(),
            group_id,
            if_center: if_center.into(),
        }
    }

    fn assert_invalid(res: Result<impl std::fmt::Debug>) {
        match res {
            Err(AlarmError::ParamInvalid(_)) => {}
            other => panic!("expected ParamInvalid, got {other:?}"),
        }
    }

    #[test]
    fn accepts_well_formed_report() {
        let report = validate_report(&report(vec![alarm()])).unwrap();
        assert_eq!(report.serial, "E1");
        let entry = &report.alarms[0];
        assert_eq!(entry.kind, AlarmKind::Alarm);
        assert_eq!(entry.severity, Severity::Major);
        assert_eq!(entry.notification, Notification::Alarm);
        assert_eq!(entry.created_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn accepts_empty_alarm_list_and_center_serial() {
        let mut req = report(Vec::new());
        req.sn = String::new();
        assert!(validate_report(&req).unwrap().alarms.is_empty());
    }

    #[test]
    fn rejects_bad_envelope_fields() {
        let mut req = report(vec![alarm()]);
        req.ip = "10.0.0".into();
        assert_invalid(validate_report(&req));

        let mut req = report(vec![alarm()]);
        req.ip = "::1".into();
        assert_invalid(validate_report(&req));

        let mut req = report(vec![alarm()]);
        req.sn = "bad serial".into();
        assert_invalid(validate_report(&req));

        assert_invalid(validate_report(&report(vec![alarm(); MAX_ALARMS_PER_REPORT + 1])));
        assert!(validate_report(&report(vec![alarm(); MAX_ALARMS_PER_REPORT])).is_ok());
    }

    #[test]
    fn one_bad_entry_fails_the_envelope() {
        let mut bad = alarm();
        bad.alarm_id = "0x1000003".into();
        assert_invalid(validate_report(&report(vec![alarm(), bad])));
    }

    #[test]
    fn rejects_bad_entry_fields() {
        let cases: [fn(&mut AlarmReq); 13] = [
            |a| a.alarm_type = "Alarm".into(),
            |a| a.alarm_id = "0x0100000G".into(),
            |a| a.alarm_id = "0x11000003".into(),
            |a| a.alarm_name = "name!".into(),
            |a| a.alarm_name = "n".repeat(65),
            |a| a.resource = "a/b".into(),
            |a| a.perceived_severity = "major".into(),
            |a| a.notification_type = "recover".into(),
            |a| a.detailed_information = "d".repeat(257),
            |a| a.suggestion = "s".repeat(513),
            |a| a.reason = "r".repeat(257),
            |a| a.impact = "i".repeat(257),
            |a| a.timestamp = "2024-01-01 00:00:00".into(),
        ];
        for mutate in cases {
            let mut entry = alarm();
            mutate(&mut entry);
            assert_invalid(validate_report(&report(vec![entry])));
        }
    }

    #[test]
    fn length_limits_count_characters() {
        let mut entry = alarm();
        entry.detailed_information = "磁".repeat(256);
        entry.suggestion = "s".repeat(512);
        assert!(validate_report(&report(vec![entry])).is_ok());
    }

    #[test]
    fn empty_notification_is_accepted() {
        let mut entry = alarm();
        entry.notification_type = String::new();
        let report = validate_report(&report(vec![entry])).unwrap();
        assert_eq!(report.alarms[0].notification, Notification::Unset);
    }

    #[test]
    fn query_scope_selection() {
        let scope = |sn: &str, group: i64, center: &str| {
            validate_query(&query(1, 10, sn, group, center)).unwrap().scope
        };
        assert_eq!(scope("", 0, "true"), QueryScope::Center);
        assert_eq!(scope("E1", 3, "true"), QueryScope::Center);
        assert_eq!(scope("", 0, ""), QueryScope::All);
        assert_eq!(scope("", 0, "false"), QueryScope::AllEdge);
        assert_eq!(scope("E1", 0, "false"), QueryScope::BySerial("E1".into()));
        assert_eq!(scope("E1", 0, ""), QueryScope::BySerial("E1".into()));
        assert_eq!(scope("", 7, ""), QueryScope::ByGroup(7));
    }

    #[test]
    fn query_bounds() {
        assert_invalid(validate_query(&query(0, 10, "", 0, "")));
        assert_invalid(validate_query(&query(i64::from(i32::MAX) + 1, 10, "", 0, "")));
        assert!(validate_query(&query(i64::from(i32::MAX), 10, "", 0, "")).is_ok());
        assert_invalid(validate_query(&query(1, 0, "", 0, "")));
        assert_invalid(validate_query(&query(1, 101, "", 0, "")));
        assert!(validate_query(&query(1, 100, "", 0, "")).is_ok());
        assert_invalid(validate_query(&query(1, 10, "", -1, "")));
        assert_invalid(validate_query(&query(1, 10, "", i64::from(u32::MAX) + 1, "")));
        assert!(validate_query(&query(1, 10, "", i64::from(u32::MAX), "")).is_ok());
        assert_invalid(validate_query(&query(1, 10, "", 0, "yes")));
        assert_invalid(validate_query(&query(1, 10, "E1", 7, "false")));
        assert_invalid(validate_query(&query(1, 10, "bad sn", 0, "")));
    }

    #[test]
    fn detail_id_parsing() {
        assert_eq!(parse_detail_id(b"42").unwrap(), 42);
        assert!(matches!(parse_detail_id(b"\"x\""), Err(AlarmError::ParamConvert(_))));
        assert!(matches!(parse_detail_id(b"-1"), Err(AlarmError::ParamConvert(_))));
        assert_invalid(parse_detail_id(b"0"));
        assert_invalid(parse_detail_id(format!("{}", i64::MAX as u64 + 1).as_bytes()));
    }

    #[test]
    fn decode_reports_shape_mismatch() {
        let res: Result<AlarmsReq> = decode(br#"{"alarm": 3}"#);
        assert!(matches!(res, Err(AlarmError::ParamConvert(_))));
        let ok: AlarmsReq = decode(br#"{"serialNumber":"E1","ip":"10.0.0.1"}"#).unwrap();
        assert!(ok.alarms.is_empty());
    }
}
