//! Upvote repository.

use std::sync::Arc;

use crate::entities::{Upvote, upvote};
use civicwatch_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};

/// Upvote repository for database operations.
#[derive(Clone)]
pub struct UpvoteRepository {
    db: Arc<DatabaseConnection>,
}

impl UpvoteRepository {
    /// Create a new upvote repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an upvote by user and report.
    pub async fn find_by_user_and_report(
        &self,
        user_id: &str,
        report_id: &str,
    ) -> AppResult<Option<upvote::Model>> {
        Upvote::find()
            .filter(upvote::Column::UserId.eq(user_id))
            .filter(upvote::Column::ReportId.eq(report_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a user has upvoted a report.
    pub async fn has_upvoted(&self, user_id: &str, report_id: &str) -> AppResult<bool> {
        Ok(self
            .find_by_user_and_report(user_id, report_id)
            .await?
            .is_some())
    }

    /// Create a new upvote. The unique (user, report) index rejects
    /// duplicates at the schema level; a unique violation surfaces as
    /// `Conflict` so callers can treat the race as already-upvoted.
    pub async fn create(&self, model: upvote::ActiveModel) -> AppResult<upvote::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            let msg = e.to_string();
            if msg.contains("duplicate key") || msg.contains("unique constraint") {
                AppError::Conflict("Already upvoted".to_string())
            } else {
                AppError::Database(msg)
            }
        })
    }

    /// Delete a user's upvote on a report, returning how many rows were
    /// removed. Zero means the user had not upvoted.
    pub async fn delete_by_user_and_report(
        &self,
        user_id: &str,
        report_id: &str,
    ) -> AppResult<u64> {
        let result = Upvote::delete_many()
            .filter(upvote::Column::UserId.eq(user_id))
            .filter(upvote::Column::ReportId.eq(report_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Count upvotes on a report.
    pub async fn count_by_report(&self, report_id: &str) -> AppResult<u64> {
        Upvote::find()
            .filter(upvote::Column::ReportId.eq(report_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
