//! Migration: Create service_points table

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_companies::Companies;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServicePoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServicePoints::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ServicePoints::Name).string().not_null())
                    .col(
                        ColumnDef::new(ServicePoints::Type)
                            .string_len(16)
                            .not_null()
                            .default("ATM"),
                    )
                    .col(ColumnDef::new(ServicePoints::Address).string().not_null())
                    .col(ColumnDef::new(ServicePoints::Latitude).double().not_null())
                    .col(ColumnDef::new(ServicePoints::Longitude).double().not_null())
                    .col(
                        ColumnDef::new(ServicePoints::CompanyId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServicePoints::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServicePoints::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_points_company")
                            .from(ServicePoints::Table, ServicePoints::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_service_points_company")
                    .table(ServicePoints::Table)
                    .col(ServicePoints::CompanyId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ServicePoints::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
#[iden = "service_points"]
pub enum ServicePoints {
    Table,
    Id,
    Name,
    Type,
    Address,
    Latitude,
    Longitude,
    #[iden = "company_id"]
    CompanyId,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}
