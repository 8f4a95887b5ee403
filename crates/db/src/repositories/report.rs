//! Report repository.

use std::sync::Arc;

use crate::entities::{
    Report, report,
    report::{Category, Severity, Status},
    report_history,
};
use chrono::Utc;
use civicwatch_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    Statement, TransactionTrait, sea_query::Expr,
};

/// Meters per degree of latitude, used for the bounding-box pre-filter.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Filters for admin report listings. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ReportFilters {
    pub status: Option<Status>,
    pub category: Option<Category>,
    pub severity: Option<Severity>,
    pub user_id: Option<String>,
}

impl ReportFilters {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(status) = self.status {
            condition = condition.add(report::Column::Status.eq(status));
        }
        if let Some(category) = self.category {
            condition = condition.add(report::Column::Category.eq(category));
        }
        if let Some(severity) = self.severity {
            condition = condition.add(report::Column::Severity.eq(severity));
        }
        if let Some(user_id) = &self.user_id {
            condition = condition.add(report::Column::UserId.eq(user_id.clone()));
        }
        condition
    }
}

#[derive(FromQueryResult)]
struct NearbyRow {
    id: String,
    distance_m: f64,
}

#[derive(FromQueryResult)]
struct CountRow {
    count: i64,
}

/// Report repository for database operations.
#[derive(Clone)]
pub struct ReportRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a report by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<report::Model>> {
        Report::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a report by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<report::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ReportNotFound(id.to_string()))
    }

    /// Create a new report.
    pub async fn create(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a report together with its initial history row, atomically.
    pub async fn create_with_history(
        &self,
        report: report::ActiveModel,
        history: report_history::ActiveModel,
    ) -> AppResult<report::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = report
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        history
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(created)
    }

    /// Update a report.
    pub async fn update(&self, model: report::ActiveModel) -> AppResult<report::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a report. History rows and upvotes cascade at the schema level.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let report = self.get_by_id(id).await?;
        report
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Move a report to a new status and append the matching history row
    /// in a single transaction.
    pub async fn apply_transition(
        &self,
        report_id: &str,
        status: Status,
        history: report_history::ActiveModel,
    ) -> AppResult<report::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let model = Report::find_by_id(report_id)
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::ReportNotFound(report_id.to_string()))?;

        let mut active: report::ActiveModel = model.into();
        active.status = Set(status);
        active.updated_at = Set(Some(Utc::now().into()));
        let updated = active
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        history
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(updated)
    }

    /// List a user's reports newest-first (paginated).
    pub async fn find_by_owner(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(report::Column::UserId.eq(user_id))
            .order_by_desc(report::Column::CreatedAt)
            .order_by_asc(report::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count a user's reports.
    pub async fn count_by_owner(&self, user_id: &str) -> AppResult<u64> {
        Report::find()
            .filter(report::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List reports matching the given filters, newest-first (paginated).
    pub async fn find_filtered(
        &self,
        filters: &ReportFilters,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(filters.condition())
            .order_by_desc(report::Column::CreatedAt)
            .order_by_asc(report::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count reports matching the given filters.
    pub async fn count_filtered(&self, filters: &ReportFilters) -> AppResult<u64> {
        Report::find()
            .filter(filters.condition())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find reports within `radius_m` meters of a point, nearest-first.
    ///
    /// Distance is computed with the haversine formula in SQL, after a
    /// bounding-box pre-filter that lets the (latitude, longitude) index
    /// discard most rows. Returns each report with its distance in meters.
    pub async fn find_nearby(
        &self,
        lat: f64,
        lng: f64,
        radius_m: f64,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<(report::Model, f64)>> {
        let bounds = BoundingBox::around(lat, lng, radius_m);

        let sql = format!(
            "SELECT id, distance_m FROM ({HAVERSINE_SUBQUERY}) AS candidates \
             WHERE distance_m <= $7 ORDER BY distance_m ASC, id ASC LIMIT $8 OFFSET $9"
        );

        let rows = NearbyRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            &sql,
            [
                lat.into(),
                lng.into(),
                bounds.lat_min.into(),
                bounds.lat_max.into(),
                bounds.lng_min.into(),
                bounds.lng_max.into(),
                radius_m.into(),
                i64::try_from(limit).unwrap_or(i64::MAX).into(),
                i64::try_from(offset).unwrap_or(i64::MAX).into(),
            ],
        ))
        .all(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let models = Report::find()
            .filter(report::Column::Id.is_in(ids))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Re-attach distances in the order the ranked query produced.
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(model) = models.iter().find(|m| m.id == row.id) {
                results.push((model.clone(), row.distance_m));
            }
        }
        Ok(results)
    }

    /// Count reports within `radius_m` meters of a point.
    pub async fn count_nearby(&self, lat: f64, lng: f64, radius_m: f64) -> AppResult<u64> {
        let bounds = BoundingBox::around(lat, lng, radius_m);

        let sql = format!(
            "SELECT COUNT(*) AS count FROM ({HAVERSINE_SUBQUERY}) AS candidates \
             WHERE distance_m <= $7"
        );

        let row = CountRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            &sql,
            [
                lat.into(),
                lng.into(),
                bounds.lat_min.into(),
                bounds.lat_max.into(),
                bounds.lng_min.into(),
                bounds.lng_max.into(),
                radius_m.into(),
            ],
        ))
        .one(self.db.as_ref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.map_or(0, |r| u64::try_from(r.count).unwrap_or(0)))
    }

    /// Increment upvote count atomically (single UPDATE query, no fetch).
    pub async fn increment_upvote_count(&self, report_id: &str) -> AppResult<()> {
        Report::update_many()
            .col_expr(
                report::Column::UpvoteCount,
                Expr::col(report::Column::UpvoteCount).add(1),
            )
            .filter(report::Column::Id.eq(report_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement upvote count atomically (single UPDATE query, no fetch).
    pub async fn decrement_upvote_count(&self, report_id: &str) -> AppResult<()> {
        Report::update_many()
            .col_expr(
                report::Column::UpvoteCount,
                Expr::cust("GREATEST(upvote_count - 1, 0)"),
            )
            .filter(report::Column::Id.eq(report_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Haversine distance from the query point ($1, $2), restricted to the
/// bounding box ($3..$4, $5..$6).
const HAVERSINE_SUBQUERY: &str = "SELECT id, (2.0 * 6371000.0 * asin(sqrt(\
    power(sin(radians(latitude - $1) / 2.0), 2) + \
    cos(radians($1)) * cos(radians(latitude)) * \
    power(sin(radians(longitude - $2) / 2.0), 2)\
    ))) AS distance_m FROM report \
    WHERE latitude BETWEEN $3 AND $4 AND longitude BETWEEN $5 AND $6";

/// Geographic bounding box that fully contains a radius around a point.
struct BoundingBox {
    lat_min: f64,
    lat_max: f64,
    lng_min: f64,
    lng_max: f64,
}

impl BoundingBox {
    fn around(lat: f64, lng: f64, radius_m: f64) -> Self {
        let lat_delta = radius_m / METERS_PER_DEGREE;
        let lat_min = (lat - lat_delta).max(-90.0);
        let lat_max = (lat + lat_delta).min(90.0);

        // Longitude degrees shrink toward the poles. Near a pole, or when
        // the box would cross the antimeridian, fall back to the full
        // longitude range; the haversine filter still bounds the result.
        let cos_lat = lat.to_radians().cos();
        let (lng_min, lng_max) = if cos_lat < 1e-6 {
            (-180.0, 180.0)
        } else {
            let lng_delta = radius_m / (METERS_PER_DEGREE * cos_lat);
            let min = lng - lng_delta;
            let max = lng + lng_delta;
            if min < -180.0 || max > 180.0 {
                (-180.0, 180.0)
            } else {
                (min, max)
            }
        };

        Self {
            lat_min,
            lat_max,
            lng_min,
            lng_max,
        }
    }
}
