use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a cleaning task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "OVERDUE")]
    Overdue,
}

impl TaskStatus {
    /// States a cleaner may still act on
    pub const OPEN: [TaskStatus; 2] = [TaskStatus::Pending, TaskStatus::InProgress];

    /// States a manager may delete from
    pub const DELETABLE: [TaskStatus; 2] = [TaskStatus::Pending, TaskStatus::Overdue];

    /// Sort rank for cleaner views: lower sorts first
    pub fn priority(&self) -> u8 {
        match self {
            TaskStatus::Overdue => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Pending => 2,
            TaskStatus::Completed => 3,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "PENDING"),
            TaskStatus::InProgress => write!(f, "IN_PROGRESS"),
            TaskStatus::Completed => write!(f, "COMPLETED"),
            TaskStatus::Overdue => write!(f, "OVERDUE"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cleaning_tasks")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub service_point_id: i64,
    pub cleaner_id: i64,
    pub status: TaskStatus,
    pub scheduled_at: Option<DateTimeUtc>,
    /// Day key set only by the daily generator; unique per (cleaner, point)
    #[serde(skip_serializing)]
    pub generation_day: Option<Date>,
    pub completed_at: Option<DateTimeUtc>,
    /// Legacy JSON-encoded list of photo paths
    pub photos: Option<String>,
    pub photo_before: Option<String>,
    pub photo_after: Option<String>,
    pub photo_damage: Option<String>,
    pub notes: Option<String>,
    pub manager_notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::service_point::Entity",
        from = "Column::ServicePointId",
        to = "super::service_point::Column::Id",
        on_delete = "Cascade"
    )]
    ServicePoint,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CleanerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Cleaner,
}

impl Related<super::service_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServicePoint.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cleaner.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
