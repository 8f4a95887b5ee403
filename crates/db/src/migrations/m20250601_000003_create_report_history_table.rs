//! Create report history table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReportHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReportHistory::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReportHistory::ReportId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReportHistory::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReportHistory::Notes).text().null())
                    .col(
                        ColumnDef::new(ReportHistory::UpdatedBy)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReportHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_history_report")
                            .from(ReportHistory::Table, ReportHistory::ReportId)
                            .to(Report::Table, Report::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: report_id (for reading a report's history in order)
        manager
            .create_index(
                Index::create()
                    .name("idx_report_history_report_id")
                    .table(ReportHistory::Table)
                    .col(ReportHistory::ReportId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReportHistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ReportHistory {
    Table,
    Id,
    ReportId,
    Status,
    Notes,
    UpdatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum Report {
    Table,
    Id,
}
