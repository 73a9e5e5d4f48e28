pub use sea_orm_migration::prelude::*;

mod m001_alarm_infos;
mod m002_alarm_configs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m001_alarm_infos::Migration),
            Box::new(m002_alarm_configs::Migration),
        ]
    }
}
