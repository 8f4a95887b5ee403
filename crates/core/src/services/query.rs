//! Read-side queries: listings, nearby search and dashboard aggregates.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use civicwatch_common::{AppError, AppResult, GeoPoint, validate_radius};
use civicwatch_db::{
    entities::{report, report::Status, user},
    repositories::{ReportFilters, ReportRepository, StatsRepository},
};
use serde::Serialize;

use crate::services::Page;

/// Default page size when the client does not ask for one.
pub const DEFAULT_LIMIT: u64 = 20;

/// Upper bound on page size.
pub const MAX_LIMIT: u64 = 100;

/// A report paired with its distance from a query point.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyReport {
    #[serde(flatten)]
    pub report: report::Model,
    /// Distance from the query point in meters.
    pub distance_m: f64,
}

/// Aggregate numbers for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_reports: u64,
    pub reports_last_week: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_category: BTreeMap<String, u64>,
    pub by_severity: BTreeMap<String, u64>,
    pub total_upvotes: u64,
    /// Mean upvotes per report, zero when there are no reports.
    pub average_upvotes: f64,
    pub total_users: u64,
    pub active_users: u64,
}

/// Per-user contribution numbers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_reports: u64,
    pub resolved_reports: u64,
    pub rejected_reports: u64,
    pub upvotes_received: u64,
}

/// Query service for listings and statistics.
#[derive(Clone)]
pub struct QueryService {
    report_repo: ReportRepository,
    stats_repo: StatsRepository,
}

impl QueryService {
    /// Create a new query service.
    #[must_use]
    pub const fn new(report_repo: ReportRepository, stats_repo: StatsRepository) -> Self {
        Self {
            report_repo,
            stats_repo,
        }
    }

    /// Clamp a requested page size into `1..=MAX_LIMIT`.
    #[must_use]
    pub fn clamp_limit(limit: Option<u64>) -> u64 {
        limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// Row offset for a 1-based page number, saturating on absurd pages.
    #[must_use]
    pub const fn page_offset(page: u64, limit: u64) -> u64 {
        page.saturating_sub(1).saturating_mul(limit)
    }

    /// List the actor's own reports, newest first.
    pub async fn list_owned(
        &self,
        actor: &user::Model,
        limit: u64,
        offset: u64,
    ) -> AppResult<Page<report::Model>> {
        let items = self
            .report_repo
            .find_by_owner(&actor.id, limit, offset)
            .await?;
        let total = self.report_repo.count_by_owner(&actor.id).await?;
        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    /// List reports within a radius of a point, nearest first.
    ///
    /// Reports exactly at the radius boundary are included.
    pub async fn list_nearby(
        &self,
        lat: f64,
        lng: f64,
        radius_m: f64,
        limit: u64,
        offset: u64,
    ) -> AppResult<Page<NearbyReport>> {
        let point = GeoPoint::new(lat, lng)?;
        validate_radius(radius_m)?;

        let rows = self
            .report_repo
            .find_nearby(point.lat, point.lng, radius_m, limit, offset)
            .await?;
        let total = self
            .report_repo
            .count_nearby(point.lat, point.lng, radius_m)
            .await?;

        let items = rows
            .into_iter()
            .map(|(report, distance_m)| NearbyReport { report, distance_m })
            .collect();

        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    /// Admin listing across all reports with optional filters, newest first.
    pub async fn admin_list(
        &self,
        actor: &user::Model,
        filters: &ReportFilters,
        limit: u64,
        offset: u64,
    ) -> AppResult<Page<report::Model>> {
        require_admin(actor)?;

        let items = self.report_repo.find_filtered(filters, limit, offset).await?;
        let total = self.report_repo.count_filtered(filters).await?;
        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    /// Live dashboard aggregates, computed from the tables on every call.
    pub async fn dashboard_stats(&self, actor: &user::Model) -> AppResult<DashboardStats> {
        require_admin(actor)?;

        let week_ago = (Utc::now() - Duration::days(7)).into();
        let total_reports = self.stats_repo.total_reports().await?;
        let total_upvotes = self.stats_repo.total_upvotes().await?;

        #[allow(clippy::cast_precision_loss)]
        let average_upvotes = if total_reports == 0 {
            0.0
        } else {
            total_upvotes as f64 / total_reports as f64
        };

        Ok(DashboardStats {
            total_reports,
            reports_last_week: self.stats_repo.reports_since(week_ago).await?,
            by_status: self
                .stats_repo
                .reports_by_status()
                .await?
                .into_iter()
                .map(|(k, v)| (k.as_str().to_string(), v))
                .collect(),
            by_category: self
                .stats_repo
                .reports_by_category()
                .await?
                .into_iter()
                .map(|(k, v)| (k.as_str().to_string(), v))
                .collect(),
            by_severity: self
                .stats_repo
                .reports_by_severity()
                .await?
                .into_iter()
                .map(|(k, v)| (k.as_str().to_string(), v))
                .collect(),
            total_upvotes,
            average_upvotes,
            total_users: self.stats_repo.total_users().await?,
            active_users: self.stats_repo.active_users().await?,
        })
    }

    /// Contribution numbers for one user.
    pub async fn user_stats(&self, user_id: &str) -> AppResult<UserStats> {
        let by_status = self.stats_repo.reports_by_status_for_user(user_id).await?;

        let count_of = |status: Status| {
            by_status
                .iter()
                .find(|(s, _)| *s == status)
                .map_or(0, |(_, n)| *n)
        };

        Ok(UserStats {
            total_reports: by_status.iter().map(|(_, n)| n).sum(),
            resolved_reports: count_of(Status::Resolved),
            rejected_reports: count_of(Status::Rejected),
            upvotes_received: self.stats_repo.upvotes_received(user_id).await?,
        })
    }
}

/// Gate admin-only queries on the actor's role.
fn require_admin(actor: &user::Model) -> AppResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin role required".to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use civicwatch_common::AppError;
    use std::sync::Arc;

    use sea_orm::{DatabaseBackend, MockDatabase};

    fn service() -> QueryService {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        QueryService::new(
            ReportRepository::new(db.clone()),
            StatsRepository::new(db),
        )
    }

    #[test]
    fn test_clamp_limit_default() {
        assert_eq!(QueryService::clamp_limit(None), DEFAULT_LIMIT);
    }

    #[test]
    fn test_clamp_limit_bounds() {
        assert_eq!(QueryService::clamp_limit(Some(0)), 1);
        assert_eq!(QueryService::clamp_limit(Some(1000)), MAX_LIMIT);
        assert_eq!(QueryService::clamp_limit(Some(50)), 50);
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(QueryService::page_offset(1, 20), 0);
        assert_eq!(QueryService::page_offset(3, 20), 40);
    }

    #[test]
    fn test_page_offset_saturates() {
        assert_eq!(QueryService::page_offset(u64::MAX, MAX_LIMIT), u64::MAX);
        assert_eq!(QueryService::page_offset(0, 20), 0);
    }

    fn plain_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: "Test".to_string(),
            email: format!("{id}@example.com"),
            password_hash: "$argon2id$test".to_string(),
            role: civicwatch_db::entities::user::Role::User,
            is_active: true,
            token: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_dashboard_stats_requires_admin() {
        let svc = service();
        let result = svc.dashboard_stats(&plain_user("u1")).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_admin_list_requires_admin() {
        let svc = service();
        let result = svc
            .admin_list(&plain_user("u1"), &ReportFilters::default(), 20, 0)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_list_nearby_rejects_bad_coordinates() {
        let svc = service();
        let result = svc.list_nearby(95.0, 0.0, 500.0, 20, 0).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_nearby_rejects_nonpositive_radius() {
        let svc = service();
        let result = svc.list_nearby(10.0, 10.0, 0.0, 20, 0).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
