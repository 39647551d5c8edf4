use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;

use crate::config::database::DatabaseConfig;
use crate::config::CONFIG;
use crate::error::{AppError, Result};
use crate::migrations::Migrator;

pub type DbConn = DatabaseConnection;

/// Connect with the configured URL and bring the schema up to date
pub async fn connect() -> Result<DbConn> {
    connect_with(&CONFIG.database).await
}

pub async fn connect_with(config: &DatabaseConfig) -> Result<DbConn> {
    let backend = if config.is_sqlite() { "sqlite" } else { "postgres" };
    tracing::info!(backend, max_connections = config.max_connections, "Connecting to database");

    let db = Database::connect(connect_options(config))
        .await
        .map_err(|e| AppError::Internal(format!("Failed to connect to database: {}", e)))?;

    Migrator::up(&db, None)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to run migrations: {}", e)))?;
    tracing::info!("Database migrations completed");

    Ok(db)
}

fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(config.database_url.clone());
    // One writer at a time keeps SQLite from reporting "database is locked"
    let max = if config.is_sqlite() { 1 } else { config.max_connections };
    opts.max_connections(max)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);
    opts
}
