//! Northbound list and detail queries.

use std::sync::Arc;

use edgealarm_common::status::Status;
use edgealarm_common::types::{AlarmDetail, AlarmKind, AlarmPage, ListAlarmOrEventReq};
use edgealarm_storage::{AlarmFilter, AlarmStore, SerialScope};

use crate::directory::{GroupMembers, NodeDirectory};
use crate::error::{AlarmError, Result};
use crate::validate::{validate_query, QueryScope};

impl QueryScope {
    /// Response code used when the store fails under this scope.
    pub fn failure_status(&self) -> Status {
        match self {
            QueryScope::Center => Status::ErrorListCenterNodeAlarm,
            QueryScope::BySerial(_) => Status::ErrorListEdgeNodeAlarm,
            QueryScope::ByGroup(_) => Status::ErrorListGroupAlarm,
            QueryScope::AllEdge | QueryScope::All => Status::ErrorListAlarm,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            QueryScope::Center => "center",
            QueryScope::BySerial(_) => "serial",
            QueryScope::ByGroup(_) => "group",
            QueryScope::AllEdge => "all-edge",
            QueryScope::All => "all",
        }
    }
}

pub struct QueryEngine {
    store: Arc<AlarmStore>,
    nodes: Arc<dyn NodeDirectory>,
}

impl QueryEngine {
    pub fn new(store: Arc<AlarmStore>, nodes: Arc<dyn NodeDirectory>) -> Self {
        Self { store, nodes }
    }

    /// Lists one page of `kind` records for the scope the request selects.
    pub async fn list(&self, req: &ListAlarmOrEventReq, kind: AlarmKind) -> Result<AlarmPage> {
        let query = validate_query(req)?;
        let status = query.scope.failure_status();

        let scope = match &query.scope {
            QueryScope::Center => SerialScope::Center,
            QueryScope::BySerial(sn) => SerialScope::Serial(sn.clone()),
            QueryScope::AllEdge => SerialScope::AllEdge,
            QueryScope::All => SerialScope::All,
            QueryScope::ByGroup(group_id) => match self.nodes.sns_by_group(*group_id).await? {
                GroupMembers::Found(sns) if !sns.is_empty() => SerialScope::Serials(sns),
                GroupMembers::Found(_) => return Ok(AlarmPage::default()),
                GroupMembers::NotFound => {
                    tracing::info!(group_id, "Node group not found, returning empty list");
                    return Ok(AlarmPage::default());
                }
            },
        };
        let filter = AlarmFilter::new(kind, scope);

        let total = self
            .store
            .count_alarms(&filter)
            .await
            .map_err(AlarmError::store(status, format!("failed to count {kind}s")))?;
        let records = self
            .store
            .list_page(&filter, query.page_num, query.page_size)
            .await
            .map_err(AlarmError::store(status, format!("failed to list {kind}s")))?;

        tracing::debug!(
            scope = query.scope.label(),
            kind = %kind,
            total,
            returned = records.len(),
            "Listed records"
        );
        Ok(AlarmPage {
            total,
            records: records.iter().map(|r| r.digest()).collect(),
        })
    }

    /// Full record by id. A record of the other kind is reported as
    /// [`AlarmError::WrongKind`], never as not found.
    pub async fn detail(&self, id: u64, kind: AlarmKind) -> Result<AlarmDetail> {
        if id == 0 || id > i64::MAX as u64 {
            return Err(AlarmError::ParamInvalid(format!("id[{id}] is out of range")));
        }
        let record = self
            .store
            .get_alarm_by_id(id)
            .await
            .map_err(AlarmError::store(Status::ErrorGetAlarmDetail, format!("failed to get {kind}[{id}]")))?
            .ok_or(AlarmError::RecordNotFound(id))?;
        if !record.is_kind(kind) {
            return Err(AlarmError::WrongKind { id, expected: kind });
        }
        Ok(record.into_detail())
    }
}
