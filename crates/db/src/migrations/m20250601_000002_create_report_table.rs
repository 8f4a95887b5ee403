//! Create report table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Report::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Report::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Report::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Report::Description).text().not_null())
                    .col(ColumnDef::new(Report::Category).string_len(32).not_null())
                    .col(ColumnDef::new(Report::Severity).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Report::Status)
                            .string_len(16)
                            .not_null()
                            .default("reported"),
                    )
                    .col(ColumnDef::new(Report::Latitude).double().not_null())
                    .col(ColumnDef::new(Report::Longitude).double().not_null())
                    .col(
                        ColumnDef::new(Report::LocationName)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Report::Media)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(Report::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Report::UpvoteCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Report::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Report::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_user")
                            .from(Report::Table, Report::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: user_id (for owner listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_user_id")
                    .table(Report::Table)
                    .col(Report::UserId)
                    .to_owned(),
            )
            .await?;

        // Index: status + category (for admin filtered listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_status")
                    .table(Report::Table)
                    .col(Report::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_report_category")
                    .table(Report::Table)
                    .col(Report::Category)
                    .to_owned(),
            )
            .await?;

        // Index: (latitude, longitude) for nearby bounding-box pre-filter
        manager
            .create_index(
                Index::create()
                    .name("idx_report_lat_lng")
                    .table(Report::Table)
                    .col(Report::Latitude)
                    .col(Report::Longitude)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (for newest-first pagination)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_created_at")
                    .table(Report::Table)
                    .col(Report::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Report::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Report {
    Table,
    Id,
    Title,
    Description,
    Category,
    Severity,
    Status,
    Latitude,
    Longitude,
    LocationName,
    Media,
    UserId,
    UpvoteCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
