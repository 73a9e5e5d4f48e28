use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m001_alarm_infos"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(UP_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(DOWN_SQL)
            .await?;
        Ok(())
    }
}

// created_at keeps the producer's timestamp with its offset; created_nanos
// is the same instant in UTC nanoseconds and is what every ordering uses.
const UP_SQL: &str = "
CREATE TABLE IF NOT EXISTS alarm_infos (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    alarm_type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    created_nanos INTEGER NOT NULL,
    serial_number TEXT NOT NULL DEFAULT '',
    ip TEXT NOT NULL DEFAULT '',
    alarm_id TEXT NOT NULL,
    alarm_name TEXT NOT NULL DEFAULT '',
    perceived_severity TEXT NOT NULL,
    detailed_information TEXT NOT NULL DEFAULT '',
    suggestion TEXT NOT NULL DEFAULT '',
    reason TEXT NOT NULL DEFAULT '',
    impact TEXT NOT NULL DEFAULT '',
    resource TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_alarm_infos_sn_alarm_id ON alarm_infos(serial_number, alarm_id);
CREATE INDEX IF NOT EXISTS idx_alarm_infos_type ON alarm_infos(alarm_type);
CREATE INDEX IF NOT EXISTS idx_alarm_infos_sn_type_created ON alarm_infos(serial_number, alarm_type, created_nanos);
CREATE UNIQUE INDEX IF NOT EXISTS uq_alarm_infos_open_alarm ON alarm_infos(serial_number, alarm_id) WHERE alarm_type = 'alarm';
";

const DOWN_SQL: &str = "
DROP TABLE IF EXISTS alarm_infos;
";
