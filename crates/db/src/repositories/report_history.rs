//! Report history repository.

use std::sync::Arc;

use crate::entities::{ReportHistory, report_history};
use civicwatch_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Report history repository for database operations.
#[derive(Clone)]
pub struct ReportHistoryRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportHistoryRepository {
    /// Create a new report history repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append a history entry.
    pub async fn create(
        &self,
        model: report_history::ActiveModel,
    ) -> AppResult<report_history::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a report's history, oldest entry first.
    pub async fn find_by_report(&self, report_id: &str) -> AppResult<Vec<report_history::Model>> {
        ReportHistory::find()
            .filter(report_history::Column::ReportId.eq(report_id))
            .order_by_asc(report_history::Column::CreatedAt)
            .order_by_asc(report_history::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count history entries for a report.
    pub async fn count_by_report(&self, report_id: &str) -> AppResult<u64> {
        ReportHistory::find()
            .filter(report_history::Column::ReportId.eq(report_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::report::Status;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_entry(id: &str, report_id: &str, status: Status) -> report_history::Model {
        report_history::Model {
            id: id.to_string(),
            report_id: report_id.to_string(),
            status,
            notes: None,
            updated_by: "u1".to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_report() {
        let e1 = create_test_entry("h1", "r1", Status::Reported);
        let e2 = create_test_entry("h2", "r1", Status::Acknowledged);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[e1, e2]])
                .into_connection(),
        );

        let repo = ReportHistoryRepository::new(db);
        let result = repo.find_by_report("r1").await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].status, Status::Reported);
    }

    #[tokio::test]
    async fn test_find_by_report_empty() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<report_history::Model>::new()])
                .into_connection(),
        );

        let repo = ReportHistoryRepository::new(db);
        let result = repo.find_by_report("r9").await.unwrap();

        assert!(result.is_empty());
    }
}
