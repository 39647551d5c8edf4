pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_companies;
mod m20260301_000002_create_users;
mod m20260301_000003_create_service_points;
mod m20260301_000004_create_cleaner_assignments;
mod m20260301_000005_create_routes;
mod m20260301_000006_create_cleaning_tasks;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_companies::Migration),
            Box::new(m20260301_000002_create_users::Migration),
            Box::new(m20260301_000003_create_service_points::Migration),
            Box::new(m20260301_000004_create_cleaner_assignments::Migration),
            Box::new(m20260301_000005_create_routes::Migration),
            Box::new(m20260301_000006_create_cleaning_tasks::Migration),
        ]
    }
}
