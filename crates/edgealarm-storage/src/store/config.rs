use chrono::{DateTime, Utc};
use sea_orm::{sea_query::OnConflict, ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serde::{Deserialize, Serialize};

use crate::entities::alarm_config::{self, Column, Entity};
use crate::error::Result;
use crate::store::AlarmStore;

/// Runtime setting read by monitors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfigRow {
    pub config_key: String,
    pub config_value: String,
    pub updated_at: DateTime<Utc>,
}

fn to_row(m: alarm_config::Model) -> AlarmConfigRow {
    AlarmConfigRow {
        config_key: m.config_key,
        config_value: m.config_value,
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

fn active_model(key: &str, value: &str) -> alarm_config::ActiveModel {
    alarm_config::ActiveModel {
        config_key: Set(key.to_string()),
        config_value: Set(value.to_string()),
        updated_at: Set(Utc::now().fixed_offset()),
    }
}

impl AlarmStore {
    pub async fn get_config(&self, key: &str) -> Result<Option<AlarmConfigRow>> {
        Ok(Entity::find_by_id(key.to_string())
            .one(self.db())
            .await?
            .map(to_row))
    }

    /// Inserts or overwrites a setting.
    pub async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        Entity::insert(active_model(key, value))
            .on_conflict(
                OnConflict::column(Column::ConfigKey)
                    .update_columns([Column::ConfigValue, Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(self.db())
            .await?;
        Ok(())
    }

    /// Stores `value` only when `key` is absent. Returns whether a row was
    /// written.
    pub async fn seed_config(&self, key: &str, value: &str) -> Result<bool> {
        if self.get_config(key).await?.is_some() {
            return Ok(false);
        }
        active_model(key, value).insert(self.db()).await?;
        Ok(true)
    }
}
