//! Create job notification table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(JobNotification::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JobNotification::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JobNotification::UserId).integer().not_null())
                    .col(ColumnDef::new(JobNotification::JobId).integer().not_null())
                    .col(
                        ColumnDef::new(JobNotification::NotifiedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_job_notifications_user")
                            .from(JobNotification::Table, JobNotification::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_job_notifications_job")
                            .from(JobNotification::Table, JobNotification::JobId)
                            .to(Job::Table, Job::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique: (user_id, job_id) (a pair is notified at most once)
        manager
            .create_index(
                Index::create()
                    .name("idx_job_notifications_user_job")
                    .table(JobNotification::Table)
                    .col(JobNotification::UserId)
                    .col(JobNotification::JobId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, notified_at) (for the monthly usage count)
        manager
            .create_index(
                Index::create()
                    .name("idx_job_notifications_user_notified_at")
                    .table(JobNotification::Table)
                    .col(JobNotification::UserId)
                    .col(JobNotification::NotifiedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JobNotification::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum JobNotification {
    #[iden = "job_notifications"]
    Table,
    Id,
    UserId,
    JobId,
    NotifiedAt,
}

#[derive(Iden)]
enum User {
    #[iden = "users"]
    Table,
    Id,
}

#[derive(Iden)]
enum Job {
    #[iden = "jobs"]
    Table,
    Id,
}
