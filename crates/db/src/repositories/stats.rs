//! Aggregate statistics repository.
//!
//! Backs the admin dashboard with live GROUP BY queries rather than
//! maintained counters, so the numbers always match the tables.

use std::sync::Arc;

use crate::entities::{
    Report, User, report,
    report::{Category, Severity, Status},
    user,
};
use chrono::{DateTime, FixedOffset};
use civicwatch_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QuerySelect,
};

#[derive(FromQueryResult)]
struct StatusCountRow {
    status: Status,
    count: i64,
}

#[derive(FromQueryResult)]
struct CategoryCountRow {
    category: Category,
    count: i64,
}

#[derive(FromQueryResult)]
struct SeverityCountRow {
    severity: Severity,
    count: i64,
}

#[derive(FromQueryResult)]
struct SumRow {
    total: Option<i64>,
}

/// Statistics repository for dashboard aggregates.
#[derive(Clone)]
pub struct StatsRepository {
    db: Arc<DatabaseConnection>,
}

impl StatsRepository {
    /// Create a new statistics repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Total number of reports.
    pub async fn total_reports(&self) -> AppResult<u64> {
        Report::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of reports created at or after the cutoff.
    pub async fn reports_since(&self, cutoff: DateTime<FixedOffset>) -> AppResult<u64> {
        Report::find()
            .filter(report::Column::CreatedAt.gte(cutoff))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Report counts grouped by status.
    pub async fn reports_by_status(&self) -> AppResult<Vec<(Status, u64)>> {
        let rows = Report::find()
            .select_only()
            .column(report::Column::Status)
            .column_as(report::Column::Id.count(), "count")
            .group_by(report::Column::Status)
            .into_model::<StatusCountRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| (r.status, u64::try_from(r.count).unwrap_or(0)))
            .collect())
    }

    /// Report counts grouped by category.
    pub async fn reports_by_category(&self) -> AppResult<Vec<(Category, u64)>> {
        let rows = Report::find()
            .select_only()
            .column(report::Column::Category)
            .column_as(report::Column::Id.count(), "count")
            .group_by(report::Column::Category)
            .into_model::<CategoryCountRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| (r.category, u64::try_from(r.count).unwrap_or(0)))
            .collect())
    }

    /// Report counts grouped by severity.
    pub async fn reports_by_severity(&self) -> AppResult<Vec<(Severity, u64)>> {
        let rows = Report::find()
            .select_only()
            .column(report::Column::Severity)
            .column_as(report::Column::Id.count(), "count")
            .group_by(report::Column::Severity)
            .into_model::<SeverityCountRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| (r.severity, u64::try_from(r.count).unwrap_or(0)))
            .collect())
    }

    /// Total upvotes across all reports.
    pub async fn total_upvotes(&self) -> AppResult<u64> {
        let row = Report::find()
            .select_only()
            .column_as(report::Column::UpvoteCount.sum(), "total")
            .into_model::<SumRow>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row
            .and_then(|r| r.total)
            .map_or(0, |t| u64::try_from(t).unwrap_or(0)))
    }

    /// Total number of users.
    pub async fn total_users(&self) -> AppResult<u64> {
        User::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of active (not deactivated) users.
    pub async fn active_users(&self) -> AppResult<u64> {
        User::find()
            .filter(user::Column::IsActive.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// One user's report counts grouped by status.
    pub async fn reports_by_status_for_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<(Status, u64)>> {
        let rows = Report::find()
            .filter(report::Column::UserId.eq(user_id))
            .select_only()
            .column(report::Column::Status)
            .column_as(report::Column::Id.count(), "count")
            .group_by(report::Column::Status)
            .into_model::<StatusCountRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|r| (r.status, u64::try_from(r.count).unwrap_or(0)))
            .collect())
    }

    /// Total upvotes received across one user's reports.
    pub async fn upvotes_received(&self, user_id: &str) -> AppResult<u64> {
        let row = Report::find()
            .filter(report::Column::UserId.eq(user_id))
            .select_only()
            .column_as(report::Column::UpvoteCount.sum(), "total")
            .into_model::<SumRow>()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row
            .and_then(|r| r.total)
            .map_or(0, |t| u64::try_from(t).unwrap_or(0)))
    }
}
