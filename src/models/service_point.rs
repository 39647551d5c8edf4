use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of physical location
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServicePointType {
    #[default]
    #[sea_orm(string_value = "ATM")]
    Atm,
    #[sea_orm(string_value = "BUS_STOP")]
    BusStop,
}

impl std::fmt::Display for ServicePointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServicePointType::Atm => write!(f, "ATM"),
            ServicePointType::BusStop => write!(f, "BUS_STOP"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_points")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub point_type: ServicePointType,
    pub address: String,
    #[sea_orm(column_type = "Double")]
    pub latitude: f64,
    #[sea_orm(column_type = "Double")]
    pub longitude: f64,
    pub company_id: i64,
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
    #[sea_orm(has_many = "super::cleaning_task::Entity")]
    CleaningTasks,
    #[sea_orm(has_many = "super::cleaner_assignment::Entity")]
    Assignments,
    #[sea_orm(has_many = "super::route_point::Entity")]
    RoutePoints,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::cleaning_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CleaningTasks.def()
    }
}

impl Related<super::cleaner_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl Related<super::route_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoutePoints.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
