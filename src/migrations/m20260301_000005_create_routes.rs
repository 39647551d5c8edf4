//! Migration: Create routes and route_points tables

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_companies::Companies;
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
                    .table(Routes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Routes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Routes::Name).string().not_null())
                    .col(ColumnDef::new(Routes::CompanyId).big_integer().null())
                    .col(ColumnDef::new(Routes::CleanerId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Routes::OrderNum)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Routes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Routes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_routes_company")
                            .from(Routes::Table, Routes::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_routes_cleaner")
                            .from(Routes::Table, Routes::CleanerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RoutePoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoutePoints::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoutePoints::RouteId).big_integer().not_null())
                    .col(
                        ColumnDef::new(RoutePoints::ServicePointId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RoutePoints::Position).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_route_points_route")
                            .from(RoutePoints::Table, RoutePoints::RouteId)
                            .to(Routes::Table, Routes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_route_points_service_point")
                            .from(RoutePoints::Table, RoutePoints::ServicePointId)
                            .to(ServicePoints::Table, ServicePoints::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_route_points_route_position")
                    .table(RoutePoints::Table)
                    .col(RoutePoints::RouteId)
                    .col(RoutePoints::Position)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RoutePoints::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Routes::Table).if_exists().to_owned())
            .await
    }
}

#[derive(Iden)]
#[iden = "routes"]
enum Routes {
    Table,
    Id,
    Name,
    #[iden = "company_id"]
    CompanyId,
    #[iden = "cleaner_id"]
    CleanerId,
    #[iden = "order_num"]
    OrderNum,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}

#[derive(Iden)]
#[iden = "route_points"]
enum RoutePoints {
    Table,
    Id,
    #[iden = "route_id"]
    RouteId,
    #[iden = "service_point_id"]
    ServicePointId,
    Position,
}
