use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Standing fact that a cleaner is responsible for a service point
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cleaner_assignments")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub cleaner_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub service_point_id: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CleanerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Cleaner,
    #[sea_orm(
        belongs_to = "super::service_point::Entity",
        from = "Column::ServicePointId",
        to = "super::service_point::Column::Id",
        on_delete = "Cascade"
    )]
    ServicePoint,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cleaner.def()
    }
}

impl Related<super::service_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServicePoint.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
