//! Per-node admission of alarm and event reports.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use edgealarm_common::routes::{Method, REPORT_ALARM};
use edgealarm_common::status::Status;
use edgealarm_common::types::{AlarmKind, Notification, MAX_ALARM_PER_NODE, MAX_EVENT_PER_NODE};
use edgealarm_storage::{AlarmFilter, AlarmStore, NewAlarm, StorageError};

use crate::error::{AlarmError, Result};
use crate::validate::{ValidatedAlarm, ValidatedReport};

/// What happened to one report entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// An open alarm was removed.
    Cleared,
    /// Clear for an alarm that was not open.
    ClearIgnored,
    AlarmAdded,
    /// Re-report of an alarm that is already open.
    Duplicate,
    EventAdded { evicted: u64 },
}

/// Tally of one ingested envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub cleared: usize,
    pub added: usize,
    pub duplicates: usize,
    pub events: usize,
    pub evicted: u64,
}

impl IngestSummary {
    fn record(&mut self, outcome: EntryOutcome) {
        match outcome {
            EntryOutcome::Cleared => self.cleared += 1,
            EntryOutcome::ClearIgnored => {}
            EntryOutcome::AlarmAdded => self.added += 1,
            EntryOutcome::Duplicate => self.duplicates += 1,
            EntryOutcome::EventAdded { evicted } => {
                self.events += 1;
                self.evicted += evicted;
            }
        }
    }
}

/// Applies the clear, add-alarm and event protocols to validated reports.
///
/// Reports for the same serial are serialized through an async gate so the
/// quota checks and the writes that follow them never interleave.
pub struct IngestEngine {
    store: Arc<AlarmStore>,
    gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl IngestEngine {
    pub fn new(store: Arc<AlarmStore>) -> Self {
        Self {
            store,
            gates: Mutex::new(HashMap::new()),
        }
    }

    fn gate(&self, serial: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self
            .gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        gates
            .entry(serial.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Ingests every entry of `report` in order. The first failing entry
    /// stops the envelope; entries before it stay applied.
    pub async fn ingest(&self, report: &ValidatedReport) -> Result<IngestSummary> {
        let gate = self.gate(&report.serial);
        let _guard = gate.lock().await;

        let mut summary = IngestSummary::default();
        for entry in &report.alarms {
            let outcome = match (entry.kind, entry.notification) {
                (AlarmKind::Alarm, Notification::Clear) => self.clear_alarm(report, entry).await?,
                (AlarmKind::Alarm, _) => self.add_alarm(report, entry).await?,
                (AlarmKind::Event, _) => self.add_event(report, entry).await?,
            };
            summary.record(outcome);
        }
        Ok(summary)
    }

    async fn clear_alarm(&self, report: &ValidatedReport, entry: &ValidatedAlarm) -> Result<EntryOutcome> {
        let existing = self
            .store
            .lookup_open(&report.serial, &entry.alarm_id)
            .await
            .map_err(AlarmError::store(Status::ErrorReportAlarm, "lookup open alarm failed"))?;
        if existing.is_empty() {
            return Ok(EntryOutcome::ClearIgnored);
        }

        let ids: Vec<u64> = existing.iter().map(|r| r.id).collect();
        if let Err(e) = self.store.delete_alarms(&ids).await {
            tracing::error!(
                serial = %report.serial,
                ip = %report.ip,
                method = %Method::Post,
                resource = REPORT_ALARM,
                alarm_id = %entry.alarm_id,
                error = %e,
                "Clear alarm failed"
            );
            return Err(AlarmError::store(Status::ErrorReportAlarm, "delete alarm failed")(e));
        }
        tracing::info!(
            serial = %report.serial,
            ip = %report.ip,
            method = %Method::Post,
            resource = REPORT_ALARM,
            alarm_id = %entry.alarm_id,
            "Cleared alarm"
        );
        Ok(EntryOutcome::Cleared)
    }

    async fn add_alarm(&self, report: &ValidatedReport, entry: &ValidatedAlarm) -> Result<EntryOutcome> {
        let count = self
            .store
            .count_alarms(&AlarmFilter::serial(&report.serial, AlarmKind::Alarm))
            .await
            .map_err(AlarmError::store(Status::ErrorReportAlarm, "count node alarms failed"))?;
        if count >= MAX_ALARM_PER_NODE {
            tracing::warn!(
                serial = %report.serial,
                alarm_id = %entry.alarm_id,
                count,
                "Node alarm count has reached the limit, rejecting alarm"
            );
            return Err(AlarmError::QuotaExceeded {
                serial: report.serial.clone(),
                limit: MAX_ALARM_PER_NODE,
            });
        }

        let existing = self
            .store
            .lookup_open(&report.serial, &entry.alarm_id)
            .await
            .map_err(AlarmError::store(Status::ErrorReportAlarm, "lookup open alarm failed"))?;
        if !existing.is_empty() {
            return Ok(EntryOutcome::Duplicate);
        }

        match self.store.insert_alarm(&new_record(report, entry)).await {
            Ok(_) => {}
            // Lost a race with a writer outside this engine; the alarm is open either way.
            Err(StorageError::Conflict { .. }) => return Ok(EntryOutcome::Duplicate),
            Err(e) => {
                tracing::error!(
                    serial = %report.serial,
                    ip = %report.ip,
                    method = %Method::Post,
                    resource = REPORT_ALARM,
                    alarm_id = %entry.alarm_id,
                    error = %e,
                    "Add alarm failed"
                );
                return Err(AlarmError::store(Status::ErrorReportAlarm, "add alarm failed")(e));
            }
        }
        tracing::info!(
            serial = %report.serial,
            ip = %report.ip,
            method = %Method::Post,
            resource = REPORT_ALARM,
            alarm_id = %entry.alarm_id,
            severity = %entry.severity,
            "Added alarm"
        );
        Ok(EntryOutcome::AlarmAdded)
    }

    async fn add_event(&self, report: &ValidatedReport, entry: &ValidatedAlarm) -> Result<EntryOutcome> {
        let count = self
            .store
            .count_alarms(&AlarmFilter::serial(&report.serial, AlarmKind::Event))
            .await
            .map_err(AlarmError::store(Status::ErrorReportAlarm, "count node events failed"))?;

        let mut evicted = 0;
        if count >= MAX_EVENT_PER_NODE {
            let victims = self
                .store
                .oldest(&report.serial, AlarmKind::Event, MAX_EVENT_PER_NODE - 1)
                .await
                .map_err(AlarmError::store(Status::ErrorReportAlarm, "get oldest events failed"))?;
            let ids: Vec<u64> = victims.iter().map(|r| r.id).collect();
            evicted = self
                .store
                .delete_alarms(&ids)
                .await
                .map_err(AlarmError::store(Status::ErrorReportAlarm, "delete oldest events failed"))?;
            tracing::info!(
                serial = %report.serial,
                ip = %report.ip,
                method = %Method::Post,
                resource = REPORT_ALARM,
                alarm_id = %entry.alarm_id,
                evicted,
                "Evicted oldest events"
            );
        }

        self.store
            .insert_alarm(&new_record(report, entry))
            .await
            .map_err(AlarmError::store(Status::ErrorReportAlarm, "add event failed"))?;
        tracing::info!(
            serial = %report.serial,
            ip = %report.ip,
            method = %Method::Post,
            resource = REPORT_ALARM,
            alarm_id = %entry.alarm_id,
            "Added event"
        );
        Ok(EntryOutcome::EventAdded { evicted })
    }

    /// Drops every record of `serial`. Used on peer disconnect and by the
    /// node-clear route.
    pub async fn clear_node(&self, serial: &str) -> Result<u64> {
        let gate = self.gate(serial);
        let removed = {
            let _guard = gate.lock().await;
            self.store
                .delete_by_serial(serial)
                .await
                .map_err(AlarmError::store(Status::ErrorClearNodeAlarm, "clear node alarms failed"))?
        };
        drop(gate);
        self.forget_gate(serial);
        tracing::info!(serial = %serial, removed, "Cleared all alarms of node");
        Ok(removed)
    }

    // A gate nobody else holds can go; the next report recreates it.
    fn forget_gate(&self, serial: &str) {
        let mut gates = self
            .gates
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if gates.get(serial).is_some_and(|g| Arc::strong_count(g) == 1) {
            gates.remove(serial);
        }
    }
}

fn new_record(report: &ValidatedReport, entry: &ValidatedAlarm) -> NewAlarm {
    NewAlarm {
        kind: entry.kind,
        created_at: entry.created_at,
        serial_number: report.serial.clone(),
        ip: report.ip.clone(),
        alarm_id: entry.alarm_id.clone(),
        alarm_name: entry.alarm_name.clone(),
        severity: entry.severity,
        detailed_information: entry.detailed_information.clone(),
        suggestion: entry.suggestion.clone(),
        reason: entry.reason.clone(),
        impact: entry.impact.clone(),
        resource: entry.resource.clone(),
    }
}
