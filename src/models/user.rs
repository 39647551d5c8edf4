use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of an actor, as named by the identity provider's project membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "PROJECT_LEAD")]
    ProjectLead,
    #[sea_orm(string_value = "OPERATIONS_MANAGER")]
    OperationsManager,
    #[sea_orm(string_value = "MANAGER")]
    Manager,
    #[sea_orm(string_value = "SUPERVISOR")]
    Supervisor,
    #[sea_orm(string_value = "OBSERVER")]
    Observer,
    #[sea_orm(string_value = "CLEANER")]
    Cleaner,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::ProjectLead => "PROJECT_LEAD",
            UserRole::OperationsManager => "OPERATIONS_MANAGER",
            UserRole::Manager => "MANAGER",
            UserRole::Supervisor => "SUPERVISOR",
            UserRole::Observer => "OBSERVER",
            UserRole::Cleaner => "CLEANER",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(UserRole::Admin),
            "PROJECT_LEAD" => Ok(UserRole::ProjectLead),
            "OPERATIONS_MANAGER" => Ok(UserRole::OperationsManager),
            "MANAGER" => Ok(UserRole::Manager),
            "SUPERVISOR" => Ok(UserRole::Supervisor),
            "OBSERVER" => Ok(UserRole::Observer),
            "CLEANER" => Ok(UserRole::Cleaner),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub company_id: Option<i64>,
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
    #[sea_orm(has_many = "super::cleaner_assignment::Entity")]
    Assignments,
    #[sea_orm(has_many = "super::cleaning_task::Entity")]
    CleaningTasks,
    #[sea_orm(has_many = "super::route::Entity")]
    Routes,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl Related<super::cleaner_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl Related<super::cleaning_task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CleaningTasks.def()
    }
}

impl Related<super::route::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Routes.def()
    }
}

impl Related<super::service_point::Entity> for Entity {
    fn to() -> RelationDef {
        super::cleaner_assignment::Relation::ServicePoint.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::cleaner_assignment::Relation::Cleaner.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
