//! Create site scraping config and user subscription tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SiteScrapingConfig::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SiteScrapingConfig::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SiteScrapingConfig::SiteName)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SiteScrapingConfig::BaseUrl).text().not_null())
                    .col(
                        ColumnDef::new(SiteScrapingConfig::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SiteScrapingConfig::ScrapingType)
                            .string_len(16)
                            .not_null()
                            .default("HTML"),
                    )
                    .col(ColumnDef::new(SiteScrapingConfig::JobListItemSelector).text())
                    .col(ColumnDef::new(SiteScrapingConfig::TitleSelector).text())
                    .col(ColumnDef::new(SiteScrapingConfig::LinkSelector).text())
                    .col(ColumnDef::new(SiteScrapingConfig::LinkAttribute).string_len(64))
                    .col(ColumnDef::new(SiteScrapingConfig::LocationSelector).text())
                    .col(ColumnDef::new(SiteScrapingConfig::NextPageSelector).text())
                    .col(ColumnDef::new(SiteScrapingConfig::JobDescriptionSelector).text())
                    .col(ColumnDef::new(SiteScrapingConfig::JobRequisitionIdSelector).text())
                    .col(ColumnDef::new(SiteScrapingConfig::ApiEndpointTemplate).text())
                    .col(ColumnDef::new(SiteScrapingConfig::ApiMethod).string_len(16))
                    .col(ColumnDef::new(SiteScrapingConfig::ApiHeadersJson).json_binary())
                    .col(ColumnDef::new(SiteScrapingConfig::ApiPayloadTemplate).text())
                    .col(ColumnDef::new(SiteScrapingConfig::JsonDataMappings).json_binary())
                    .col(
                        ColumnDef::new(SiteScrapingConfig::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SiteScrapingConfig::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserSite::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserSite::UserId).integer().not_null())
                    .col(ColumnDef::new(UserSite::SiteId).integer().not_null())
                    .col(
                        ColumnDef::new(UserSite::Filters)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(UserSite::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(UserSite::UserId)
                            .col(UserSite::SiteId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_sites_user")
                            .from(UserSite::Table, UserSite::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_sites_site")
                            .from(UserSite::Table, UserSite::SiteId)
                            .to(SiteScrapingConfig::Table, SiteScrapingConfig::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: site_id (for resolving subscribers of a site)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_sites_site_id")
                    .table(UserSite::Table)
                    .col(UserSite::SiteId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserSite::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SiteScrapingConfig::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SiteScrapingConfig {
    #[iden = "site_scraping_configs"]
    Table,
    Id,
    SiteName,
    BaseUrl,
    IsActive,
    ScrapingType,
    JobListItemSelector,
    TitleSelector,
    LinkSelector,
    LinkAttribute,
    LocationSelector,
    NextPageSelector,
    JobDescriptionSelector,
    JobRequisitionIdSelector,
    ApiEndpointTemplate,
    ApiMethod,
    ApiHeadersJson,
    ApiPayloadTemplate,
    JsonDataMappings,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum UserSite {
    #[iden = "user_sites"]
    Table,
    UserId,
    SiteId,
    Filters,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    #[iden = "users"]
    Table,
    Id,
}
