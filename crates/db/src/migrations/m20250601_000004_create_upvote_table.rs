//! Create upvote table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Upvote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Upvote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Upvote::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Upvote::ReportId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Upvote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_upvote_user")
                            .from(Upvote::Table, Upvote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_upvote_report")
                            .from(Upvote::Table, Upvote::ReportId)
                            .to(Report::Table, Report::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, report_id) - one upvote per user per report
        manager
            .create_index(
                Index::create()
                    .name("idx_upvote_user_report")
                    .table(Upvote::Table)
                    .col(Upvote::UserId)
                    .col(Upvote::ReportId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: report_id (for counting upvotes on a report)
        manager
            .create_index(
                Index::create()
                    .name("idx_upvote_report_id")
                    .table(Upvote::Table)
                    .col(Upvote::ReportId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Upvote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Upvote {
    Table,
    Id,
    UserId,
    ReportId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Report {
    Table,
    Id,
}
