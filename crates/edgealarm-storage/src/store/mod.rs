use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

use crate::error::Result;

pub mod alarm;
pub mod config;

pub use alarm::{AlarmFilter, AlarmRecord, NewAlarm, SerialScope};
pub use config::AlarmConfigRow;

/// Unified access layer over the alarm-manager database.
///
/// Every method is an `async fn` backed by SeaORM. The store is cheap to
/// share behind an `Arc`; the underlying connection is a pool.
pub struct AlarmStore {
    pub(crate) db: DatabaseConnection,
}

impl AlarmStore {
    /// Connects and brings the schema up to date.
    ///
    /// `db_url` is the full connection URL supplied by the server config,
    /// e.g. `sqlite:///var/lib/edgealarm/alarm-manager.db?mode=rwc`.
    pub async fn new(db_url: &str) -> Result<Self> {
        let db = Database::connect(db_url).await?;

        // WAL only applies to SQLite
        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;

        tracing::info!(db_url = %db_url, "Initialized alarm store");
        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
