//! Migration: Create cleaner_assignments junction table

use sea_orm_migration::prelude::*;

use super::m20260301_000002_create_users::Users;
use super::m20260301_000003_create_service_points::ServicePoints;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CleanerAssignments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CleanerAssignments::CleanerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CleanerAssignments::ServicePointId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CleanerAssignments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(CleanerAssignments::CleanerId)
                            .col(CleanerAssignments::ServicePointId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(CleanerAssignments::Table, CleanerAssignments::CleanerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                CleanerAssignments::Table,
                                CleanerAssignments::ServicePointId,
                            )
                            .to(ServicePoints::Table, ServicePoints::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(CleanerAssignments::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
#[iden = "cleaner_assignments"]
enum CleanerAssignments {
    Table,
    #[iden = "cleaner_id"]
    CleanerId,
    #[iden = "service_point_id"]
    ServicePointId,
    #[iden = "created_at"]
    CreatedAt,
}
