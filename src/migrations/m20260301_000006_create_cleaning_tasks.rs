//! Migration: Create cleaning_tasks table
//!
//! The unique index on (cleaner_id, service_point_id, generation_day) is what
//! makes daily generation insert-if-absent. Rows with a NULL generation_day
//! (manager-created tasks) never collide.

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
                    .table(CleaningTasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CleaningTasks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CleaningTasks::ServicePointId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CleaningTasks::CleanerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CleaningTasks::Status)
                            .string_len(16)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(CleaningTasks::ScheduledAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(CleaningTasks::GenerationDay).date().null())
                    .col(
                        ColumnDef::new(CleaningTasks::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(CleaningTasks::Photos).text().null())
                    .col(ColumnDef::new(CleaningTasks::PhotoBefore).string().null())
                    .col(ColumnDef::new(CleaningTasks::PhotoAfter).string().null())
                    .col(ColumnDef::new(CleaningTasks::PhotoDamage).string().null())
                    .col(ColumnDef::new(CleaningTasks::Notes).text().null())
                    .col(ColumnDef::new(CleaningTasks::ManagerNotes).text().null())
                    .col(
                        ColumnDef::new(CleaningTasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CleaningTasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cleaning_tasks_service_point")
                            .from(CleaningTasks::Table, CleaningTasks::ServicePointId)
                            .to(ServicePoints::Table, ServicePoints::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cleaning_tasks_cleaner")
                            .from(CleaningTasks::Table, CleaningTasks::CleanerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_cleaning_tasks_generation_day")
                    .table(CleaningTasks::Table)
                    .col(CleaningTasks::CleanerId)
                    .col(CleaningTasks::ServicePointId)
                    .col(CleaningTasks::GenerationDay)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cleaning_tasks_cleaner_scheduled")
                    .table(CleaningTasks::Table)
                    .col(CleaningTasks::CleanerId)
                    .col(CleaningTasks::ScheduledAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cleaning_tasks_status")
                    .table(CleaningTasks::Table)
                    .col(CleaningTasks::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(CleaningTasks::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
#[iden = "cleaning_tasks"]
enum CleaningTasks {
    Table,
    Id,
    #[iden = "service_point_id"]
    ServicePointId,
    #[iden = "cleaner_id"]
    CleanerId,
    Status,
    #[iden = "scheduled_at"]
    ScheduledAt,
    #[iden = "generation_day"]
    GenerationDay,
    #[iden = "completed_at"]
    CompletedAt,
    Photos,
    #[iden = "photo_before"]
    PhotoBefore,
    #[iden = "photo_after"]
    PhotoAfter,
    #[iden = "photo_damage"]
    PhotoDamage,
    Notes,
    #[iden = "manager_notes"]
    ManagerNotes,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}
