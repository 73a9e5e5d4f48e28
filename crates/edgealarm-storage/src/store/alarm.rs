use chrono::{DateTime, FixedOffset};
use edgealarm_common::types::{AlarmDetail, AlarmDigest, AlarmKind, Severity, CENTER_SN};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, Condition, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
};

use crate::entities::alarm_info::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::AlarmStore;

/// A persisted alarm or event.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmRecord {
    pub id: u64,
    pub alarm_type: String,
    pub created_at: DateTime<FixedOffset>,
    pub serial_number: String,
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

impl AlarmRecord {
    pub fn is_kind(&self, kind: AlarmKind) -> bool {
        self.alarm_type == kind.as_str()
    }

    /// Short projection used by list responses.
    pub fn digest(&self) -> AlarmDigest {
        AlarmDigest {
            id: self.id,
            sn: self.serial_number.clone(),
            ip: self.ip.clone(),
            alarm_id: self.alarm_id.clone(),
            severity: self.perceived_severity.clone(),
            resource: self.resource.clone(),
            created_at: self.created_at,
            alarm_type: self.alarm_type.clone(),
        }
    }

    pub fn into_detail(self) -> AlarmDetail {
        AlarmDetail {
            id: self.id,
            alarm_type: self.alarm_type,
            created_at: self.created_at,
            sn: self.serial_number,
            ip: self.ip,
            alarm_id: self.alarm_id,
            alarm_name: self.alarm_name,
            perceived_severity: self.perceived_severity,
            detailed_information: self.detailed_information,
            suggestion: self.suggestion,
            reason: self.reason,
            impact: self.impact,
            resource: self.resource,
        }
    }
}

/// Insert payload. `created_at` is the producer's timestamp, not the
/// ingestion time.
#[derive(Debug, Clone)]
pub struct NewAlarm {
    pub kind: AlarmKind,
    pub created_at: DateTime<FixedOffset>,
    pub serial_number: String,
    pub ip: String,
    pub alarm_id: String,
    pub alarm_name: String,
    pub severity: Severity,
    pub detailed_information: String,
    pub suggestion: String,
    pub reason: String,
    pub impact: String,
    pub resource: String,
}

/// Which serial numbers a filter covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialScope {
    /// Only the center node (`serial = ""`).
    Center,
    Serial(String),
    Serials(Vec<String>),
    /// Every node except the center.
    AllEdge,
    All,
}

/// Row filter shared by the count, list and delete operations.
///
/// # Examples
///
/// ```
/// use edgealarm_common::types::AlarmKind;
/// use edgealarm_storage::{AlarmFilter, SerialScope};
///
/// let filter = AlarmFilter::serial("E1", AlarmKind::Event);
/// assert_eq!(filter.scope, SerialScope::Serial("E1".into()));
/// assert_eq!(filter.kind, Some(AlarmKind::Event));
/// assert_eq!(AlarmFilter::everything().kind, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmFilter {
    pub kind: Option<AlarmKind>,
    pub scope: SerialScope,
}

impl AlarmFilter {
    pub fn new(kind: AlarmKind, scope: SerialScope) -> Self {
        Self {
            kind: Some(kind),
            scope,
        }
    }

    pub fn serial(serial: &str, kind: AlarmKind) -> Self {
        Self::new(kind, SerialScope::Serial(serial.to_string()))
    }

    /// Every row of every kind.
    pub fn everything() -> Self {
        Self {
            kind: None,
            scope: SerialScope::All,
        }
    }

    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(kind) = self.kind {
            cond = cond.add(Column::AlarmType.eq(kind.as_str()));
        }
        match &self.scope {
            SerialScope::Center => cond.add(Column::SerialNumber.eq(CENTER_SN)),
            SerialScope::Serial(sn) => cond.add(Column::SerialNumber.eq(sn.as_str())),
            SerialScope::Serials(sns) => cond.add(Column::SerialNumber.is_in(sns.iter().cloned())),
            SerialScope::AllEdge => cond.add(Column::SerialNumber.ne(CENTER_SN)),
            SerialScope::All => cond,
        }
    }
}

fn to_record(m: alarm_info::Model) -> AlarmRecord {
    AlarmRecord {
        id: m.id.max(0) as u64,
        alarm_type: m.alarm_type,
        created_at: m.created_at,
        serial_number: m.serial_number,
        ip: m.ip,
        alarm_id: m.alarm_id,
        alarm_name: m.alarm_name,
        perceived_severity: m.perceived_severity,
        detailed_information: m.detailed_information,
        suggestion: m.suggestion,
        reason: m.reason,
        impact: m.impact,
        resource: m.resource,
    }
}

/// Producer instant in UTC nanoseconds. Instants outside the `i64` range
/// (before 1677 or after 2262) clamp to its ends.
fn sort_nanos(at: &DateTime<FixedOffset>) -> i64 {
    at.timestamp_nanos_opt().unwrap_or(if at.timestamp() < 0 {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn insert_error(err: DbErr, new: &NewAlarm) -> StorageError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StorageError::Conflict {
            entity: "alarm_info",
            key: format!("{}/{}", new.serial_number, new.alarm_id),
        },
        _ => StorageError::Db(err),
    }
}

impl AlarmStore {
    /// Persists a record and returns it with its assigned id.
    ///
    /// A second open alarm for the same `(serial, alarm_id)` is rejected by
    /// the partial unique index and surfaces as [`StorageError::Conflict`].
    pub async fn insert_alarm(&self, new: &NewAlarm) -> Result<AlarmRecord> {
        let am = alarm_info::ActiveModel {
            id: NotSet,
            alarm_type: Set(new.kind.as_str().to_string()),
            created_at: Set(new.created_at),
            created_nanos: Set(sort_nanos(&new.created_at)),
            serial_number: Set(new.serial_number.clone()),
            ip: Set(new.ip.clone()),
            alarm_id: Set(new.alarm_id.clone()),
            alarm_name: Set(new.alarm_name.clone()),
            perceived_severity: Set(new.severity.as_str().to_string()),
            detailed_information: Set(new.detailed_information.clone()),
            suggestion: Set(new.suggestion.clone()),
            reason: Set(new.reason.clone()),
            impact: Set(new.impact.clone()),
            resource: Set(new.resource.clone()),
        };
        let model = am
            .insert(self.db())
            .await
            .map_err(|e| insert_error(e, new))?;
        Ok(to_record(model))
    }

    /// Open alarms recorded for `(serial, alarm_id)`. Events sharing the
    /// alarm id are not returned.
    pub async fn lookup_open(&self, serial: &str, alarm_id: &str) -> Result<Vec<AlarmRecord>> {
        let rows = Entity::find()
            .filter(Column::SerialNumber.eq(serial))
            .filter(Column::AlarmId.eq(alarm_id))
            .filter(Column::AlarmType.eq(AlarmKind::Alarm.as_str()))
            .order_by_asc(Column::Id)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_record).collect())
    }

    pub async fn count_alarms(&self, filter: &AlarmFilter) -> Result<u64> {
        Ok(Entity::find()
            .filter(filter.condition())
            .count(self.db())
            .await?)
    }

    /// Table-wide row count.
    pub async fn count_all(&self) -> Result<u64> {
        self.count_alarms(&AlarmFilter::everything()).await
    }

    /// One page ordered by producer timestamp, id breaking ties.
    /// `page_num` is 1-based.
    pub async fn list_page(
        &self,
        filter: &AlarmFilter,
        page_num: u64,
        page_size: u64,
    ) -> Result<Vec<AlarmRecord>> {
        let offset = page_num.saturating_sub(1).saturating_mul(page_size);
        let rows = Entity::find()
            .filter(filter.condition())
            .order_by_asc(Column::CreatedNanos)
            .order_by_asc(Column::Id)
            .limit(page_size)
            .offset(offset)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_record).collect())
    }

    /// Records that must go for the `(serial, kind)` bucket to hold at most
    /// `keep_n` rows, oldest first.
    pub async fn oldest(&self, serial: &str, kind: AlarmKind, keep_n: u64) -> Result<Vec<AlarmRecord>> {
        let filter = AlarmFilter::serial(serial, kind);
        let total = self.count_alarms(&filter).await?;
        if total <= keep_n {
            return Ok(Vec::new());
        }
        let rows = Entity::find()
            .filter(filter.condition())
            .order_by_asc(Column::CreatedNanos)
            .order_by_asc(Column::Id)
            .limit(total - keep_n)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(to_record).collect())
    }

    pub async fn get_alarm_by_id(&self, id: u64) -> Result<Option<AlarmRecord>> {
        let Ok(id) = i64::try_from(id) else {
            return Ok(None);
        };
        Ok(Entity::find_by_id(id).one(self.db()).await?.map(to_record))
    }

    /// Deletes the given ids and returns the number of rows removed.
    pub async fn delete_alarms(&self, ids: &[u64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<i64> = ids.iter().filter_map(|id| i64::try_from(*id).ok()).collect();
        let res = Entity::delete_many()
            .filter(Column::Id.is_in(ids))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected)
    }

    /// Removes every record, of both kinds, reported by `serial`.
    pub async fn delete_by_serial(&self, serial: &str) -> Result<u64> {
        let res = Entity::delete_many()
            .filter(Column::SerialNumber.eq(serial))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected)
    }

    /// Drops every record except the center node's own.
    pub async fn truncate_non_center(&self) -> Result<u64> {
        let res = Entity::delete_many()
            .filter(Column::SerialNumber.ne(CENTER_SN))
            .exec(self.db())
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn truncate_all(&self) -> Result<u64> {
        let res = Entity::delete_many().exec(self.db()).await?;
        Ok(res.rows_affected)
    }
}
