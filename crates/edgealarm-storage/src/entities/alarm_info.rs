use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "alarm_infos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub alarm_type: String,
    pub created_at: DateTimeWithTimeZone,
    pub created_nanos: i64,
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

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
