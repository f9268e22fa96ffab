//! Create job table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Job::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Job::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Job::SiteId).integer().not_null())
                    .col(ColumnDef::new(Job::Title).text().not_null())
                    .col(ColumnDef::new(Job::Location).text().not_null().default(""))
                    .col(ColumnDef::new(Job::Company).text().not_null().default(""))
                    .col(ColumnDef::new(Job::JobLink).text().not_null())
                    .col(ColumnDef::new(Job::RequisitionId).big_integer().not_null())
                    .col(ColumnDef::new(Job::Description).text())
                    .col(
                        ColumnDef::new(Job::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Job::LastSeenAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_jobs_site")
                            .from(Job::Table, Job::SiteId)
                            .to(SiteScrapingConfig::Table, SiteScrapingConfig::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: (site_id, requisition_id) (one row per posting per site)
        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_site_requisition")
                    .table(Job::Table)
                    .col(Job::SiteId)
                    .col(Job::RequisitionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: last_seen_at (for the stale purge)
        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_last_seen_at")
                    .table(Job::Table)
                    .col(Job::LastSeenAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Job::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Job {
    #[iden = "jobs"]
    Table,
    Id,
    SiteId,
    Title,
    Location,
    Company,
    JobLink,
    RequisitionId,
    Description,
    CreatedAt,
    LastSeenAt,
}

#[derive(Iden)]
enum SiteScrapingConfig {
    #[iden = "site_scraping_configs"]
    Table,
    Id,
}
