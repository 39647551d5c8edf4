use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ordered grouping of service points handed to one cleaner.
///
/// `company_id` only scopes listing; member points may belong to any company.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "routes")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub company_id: Option<i64>,
    pub cleaner_id: i64,
    pub order_num: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id",
        on_delete = "Cascade"
    )]
    Company,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CleanerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Cleaner,
    #[sea_orm(has_many = "super::route_point::Entity")]
    RoutePoints,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cleaner.def()
    }
}

impl Related<super::route_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoutePoints.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
