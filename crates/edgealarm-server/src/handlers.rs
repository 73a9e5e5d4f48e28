use async_trait::async_trait;
use edgealarm_common::status::{RespMsg, Status};
use edgealarm_common::types::{AlarmKind, AlarmsReq, ClearNodeReq, ListAlarmOrEventReq};
use edgealarm_engine::validate::{decode, parse_detail_id, validate_clear_node, validate_report};
use edgealarm_engine::AlarmError;

use crate::bus::Message;
use crate::router::{MessageHandler, Reply};
use crate::state::AppState;

/// `GET /alarmmanager/v1/{alarms,events}`
pub struct ListHandler {
    pub kind: AlarmKind,
}

#[async_trait]
impl MessageHandler for ListHandler {
    async fn handle(&self, state: &AppState, msg: &Message) -> Reply {
        let result = async {
            let req: ListAlarmOrEventReq = decode(&msg.content)?;
            state.query.list(&req, self.kind).await
        }
        .await;
        match result {
            Ok(page) => Reply::Respond(RespMsg::success(page)),
            Err(e) => {
                tracing::warn!(kind = %self.kind, error = %e, "List query failed");
                Reply::Respond(e.to_resp())
            }
        }
    }
}

/// `GET /alarmmanager/v1/{alarm,event}`
pub struct DetailHandler {
    pub kind: AlarmKind,
}

#[async_trait]
impl MessageHandler for DetailHandler {
    async fn handle(&self, state: &AppState, msg: &Message) -> Reply {
        let result = async {
            let id = parse_detail_id(&msg.content)?;
            state.query.detail(id, self.kind).await
        }
        .await;
        match result {
            Ok(detail) => Reply::Respond(RespMsg::success(detail)),
            Err(e) => {
                tracing::warn!(kind = %self.kind, error = %e, "Detail query failed");
                Reply::Respond(e.to_resp())
            }
        }
    }
}

/// `POST /edge/alarm/report`. Reports have no synchronous caller, so every
/// outcome ends in the log.
pub struct ReportHandler;

#[async_trait]
impl MessageHandler for ReportHandler {
    async fn handle(&self, state: &AppState, msg: &Message) -> Reply {
        let result = async {
            let req: AlarmsReq = decode(&msg.content)?;
            let report = validate_report(&req)?;
            let summary = state.ingest.ingest(&report).await?;
            Ok::<_, AlarmError>((report.serial, summary))
        }
        .await;
        match result {
            Ok((serial, summary)) => {
                tracing::debug!(
                    serial = %serial,
                    cleared = summary.cleared,
                    added = summary.added,
                    duplicates = summary.duplicates,
                    events = summary.events,
                    evicted = summary.evicted,
                    "Report ingested"
                );
            }
            // Already logged by the ingestion engine.
            Err(AlarmError::QuotaExceeded { .. }) => {}
            Err(e @ (AlarmError::ParamConvert(_) | AlarmError::ParamInvalid(_))) => {
                tracing::warn!(error = %e, "Rejected alarm report");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to ingest alarm report");
            }
        }
        Reply::NoReply
    }
}

/// `DELETE /edge/alarm/node-clear`. Only synchronous callers get an answer.
pub struct ClearNodeHandler;

#[async_trait]
impl MessageHandler for ClearNodeHandler {
    async fn handle(&self, state: &AppState, msg: &Message) -> Reply {
        let result = async {
            let req: ClearNodeReq = decode(&msg.content)?;
            let serial = validate_clear_node(&req)?;
            state.ingest.clear_node(&serial).await
        }
        .await;
        if let Err(e) = &result {
            tracing::error!(error = %e, "Failed to clear node alarms");
        }
        if !msg.header.is_sync {
            return Reply::NoReply;
        }
        match result {
            Ok(_) => Reply::Respond(RespMsg::success_empty()),
            Err(e) => Reply::Respond(RespMsg::error(Status::ErrorClearNodeAlarm, e.to_string())),
        }
    }
}
