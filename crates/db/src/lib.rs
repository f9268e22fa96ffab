//! Postgres persistence for scrapjobs: entities, migrations and the
//! repositories behind the core store traits.

pub mod entities;
pub mod migrations;
pub mod repositories;

use std::time::Duration;

use scrapjobs_common::config::DatabaseConfig;
use scrapjobs_common::{AppError, AppResult, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::log::LevelFilter;

/// Statements slower than this are logged at warn level.
const SLOW_STATEMENT: Duration = Duration::from_secs(2);

fn connect_options(config: &DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(&config.url);
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug)
        .sqlx_slow_statements_logging_settings(LevelFilter::Warn, SLOW_STATEMENT);
    opt
}

/// Open the connection pool.
pub async fn init(config: &Config) -> AppResult<DatabaseConnection> {
    let db = Database::connect(connect_options(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!(
        max_connections = config.database.max_connections,
        "Database pool ready"
    );
    Ok(db)
}

/// Apply pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> AppResult<()> {
    let pending = migrations::Migrator::get_pending_migrations(db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .len();
    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    if pending > 0 {
        tracing::info!(applied = pending, "Database migrations applied");
    }
    Ok(())
}
