//! Create curriculum table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Curriculum::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Curriculum::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Curriculum::UserId).integer().not_null())
                    .col(ColumnDef::new(Curriculum::Title).string_len(256).not_null())
                    .col(
                        ColumnDef::new(Curriculum::IsActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Curriculum::Summary).text().not_null().default(""))
                    .col(ColumnDef::new(Curriculum::Skills).text().not_null().default(""))
                    .col(ColumnDef::new(Curriculum::Languages).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Curriculum::Experiences)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Curriculum::Educations)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Curriculum::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_curricula_user")
                            .from(Curriculum::Table, Curriculum::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, is_active) (for resolving the active curriculum)
        manager
            .create_index(
                Index::create()
                    .name("idx_curricula_user_active")
                    .table(Curriculum::Table)
                    .col(Curriculum::UserId)
                    .col(Curriculum::IsActive)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Curriculum::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Curriculum {
    #[iden = "curricula"]
    Table,
    Id,
    UserId,
    Title,
    IsActive,
    Summary,
    Skills,
    Languages,
    Experiences,
    Educations,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    #[iden = "users"]
    Table,
    Id,
}
