//! Report status history entity (append-only audit log).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::report::Status;

/// Record of one status change.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Report this entry belongs to
    #[sea_orm(indexed)]
    pub report_id: String,

    /// Status after this change
    pub status: Status,

    /// Optional notes from the acting user (required for rejections)
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    /// User who made the change
    pub updated_by: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::report::Entity",
        from = "Column::ReportId",
        to = "super::report::Column::Id",
        on_delete = "Cascade"
    )]
    Report,
}

impl Related<super::report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Report.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
