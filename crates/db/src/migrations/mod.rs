//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250601_000001_create_plan_and_user_tables;
mod m20250601_000002_create_curriculum_table;
mod m20250601_000003_create_site_tables;
mod m20250601_000004_create_job_table;
mod m20250601_000005_create_job_notification_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_plan_and_user_tables::Migration),
            Box::new(m20250601_000002_create_curriculum_table::Migration),
            Box::new(m20250601_000003_create_site_tables::Migration),
            Box::new(m20250601_000004_create_job_table::Migration),
            Box::new(m20250601_000005_create_job_notification_table::Migration),
        ]
    }
}
