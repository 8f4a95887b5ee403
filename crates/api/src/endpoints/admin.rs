//! Admin endpoints: report triage, dashboard stats and user management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    routing::{delete, get, patch},
};
use civicwatch_common::{AppError, AppResult};
use civicwatch_core::{DashboardStats, QueryService, TransitionInput, UserStats};
use civicwatch_db::{
    entities::{
        report::{Category, Severity, Status},
        user::Role,
    },
    repositories::ReportFilters,
};
use serde::{Deserialize, Serialize};

use crate::{
    endpoints::{
        auth::UserResponse,
        reports::{
            HistoryEntryResponse, ReportDetailResponse, ReportPageResponse, ReportResponse,
        },
    },
    extractors::AdminUser,
    middleware::AppState,
    rate_limit::{RateLimiterState, rate_limit_write_middleware},
    response::ApiResponse,
};

/// Admin report listing filters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReportParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub severity: Option<String>,
    pub user_id: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl AdminReportParams {
    fn filters(&self) -> AppResult<ReportFilters> {
        let status = self
            .status
            .as_deref()
            .map(|s| Status::parse(s).ok_or_else(|| unknown("status", s)))
            .transpose()?;
        let category = self
            .category
            .as_deref()
            .map(|s| Category::parse(s).ok_or_else(|| unknown("category", s)))
            .transpose()?;
        let severity = self
            .severity
            .as_deref()
            .map(|s| Severity::parse(s).ok_or_else(|| unknown("severity", s)))
            .transpose()?;

        Ok(ReportFilters {
            status,
            category,
            severity,
            user_id: self.user_id.clone(),
        })
    }
}

fn unknown(field: &str, value: &str) -> AppError {
    AppError::Validation(format!("Unknown {field}: {value}"))
}

/// List all reports with optional status/category/severity/user filters.
async fn list_reports(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Query(params): Query<AdminReportParams>,
) -> AppResult<ApiResponse<ReportPageResponse>> {
    let filters = params.filters()?;
    let page_no = params.page.unwrap_or(1).max(1);
    let limit = QueryService::clamp_limit(params.per_page);
    let offset = QueryService::page_offset(page_no, limit);

    let page = state
        .query_service
        .admin_list(&admin, &filters, limit, offset)
        .await?;

    Ok(ApiResponse::ok(ReportPageResponse {
        reports: page.items.iter().map(ReportResponse::from).collect(),
        total: page.total,
        page: page_no,
        per_page: page.limit,
    }))
}

/// Get one report with its full history.
async fn get_report(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ReportDetailResponse>> {
    let (report, history) = state.report_service.get(&id).await?;

    Ok(ApiResponse::ok(ReportDetailResponse {
        report: ReportResponse::from(&report),
        history: history.iter().map(HistoryEntryResponse::from).collect(),
    }))
}

/// Status transition request body.
#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: String,
    pub notes: Option<String>,
}

/// Move a report to a new status.
async fn update_status(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let status = Status::parse(&body.status).ok_or_else(|| unknown("status", &body.status))?;

    let report = state
        .report_service
        .transition_status(
            &admin,
            &id,
            TransitionInput {
                status,
                notes: body.notes,
            },
        )
        .await?;

    Ok(ApiResponse::ok(ReportResponse::from(&report)).with_message("Status updated"))
}

/// Rejection request body.
#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub reason: String,
}

/// Reject a report. Shorthand for a transition to `rejected` with notes.
async fn reject_report(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RejectBody>,
) -> AppResult<ApiResponse<ReportResponse>> {
    let report = state
        .report_service
        .transition_status(
            &admin,
            &id,
            TransitionInput {
                status: Status::Rejected,
                notes: Some(body.reason),
            },
        )
        .await?;

    Ok(ApiResponse::ok(ReportResponse::from(&report)).with_message("Report rejected"))
}

/// Dashboard aggregates.
async fn dashboard_stats(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<DashboardStats>> {
    let stats = state.query_service.dashboard_stats(&admin).await?;
    Ok(ApiResponse::ok(stats))
}

/// User listing parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListParams {
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// A page of users.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPageResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// List users, optionally filtered by a name/email search term.
async fn list_users(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> AppResult<ApiResponse<UserPageResponse>> {
    let page_no = params.page.unwrap_or(1).max(1);
    let limit = QueryService::clamp_limit(params.limit);
    let offset = QueryService::page_offset(page_no, limit);

    let page = state
        .user_service
        .list_users(&admin, params.search.as_deref(), limit, offset)
        .await?;

    Ok(ApiResponse::ok(UserPageResponse {
        users: page.items.iter().map(UserResponse::from).collect(),
        total: page.total,
        page: page_no,
        per_page: page.limit,
    }))
}

/// A user with their contribution stats.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetailResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub stats: UserStats,
}

/// Get one user with their contribution stats.
async fn get_user(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<UserDetailResponse>> {
    let user = state.user_service.get(&id).await?;
    let stats = state.query_service.user_stats(&user.id).await?;

    Ok(ApiResponse::ok(UserDetailResponse {
        user: UserResponse::from(&user),
        stats,
    }))
}

/// Account status request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusBody {
    pub is_active: bool,
}

/// Activate or deactivate an account.
async fn update_user_status(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UserStatusBody>,
) -> AppResult<ApiResponse<UserResponse>> {
    let user = state
        .user_service
        .set_active(&admin, &id, body.is_active)
        .await?;

    let message = if body.is_active {
        "User activated"
    } else {
        "User deactivated"
    };
    Ok(ApiResponse::ok(UserResponse::from(&user)).with_message(message))
}

/// Role change request body.
#[derive(Debug, Deserialize)]
pub struct UserRoleBody {
    pub role: String,
}

/// Change a user's role.
async fn update_user_role(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UserRoleBody>,
) -> AppResult<ApiResponse<UserResponse>> {
    let role = Role::parse(&body.role).ok_or_else(|| unknown("role", &body.role))?;
    let user = state.user_service.set_role(&admin, &id, role).await?;

    Ok(ApiResponse::ok(UserResponse::from(&user)).with_message("Role updated"))
}

/// Delete an account.
async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.user_service.delete_user(&admin, &id).await?;
    Ok(ApiResponse::message("User deleted"))
}

pub fn router(limiter: RateLimiterState) -> Router<AppState> {
    let writes = Router::new()
        .route("/reports/{id}/status", patch(update_status))
        .route("/reports/{id}/reject", patch(reject_report))
        .route("/users/{id}/status", patch(update_user_status))
        .route("/users/{id}/role", patch(update_user_role))
        .route("/users/{id}", delete(delete_user))
        .route_layer(from_fn_with_state(limiter, rate_limit_write_middleware));

    Router::new()
        .route("/reports", get(list_reports))
        .route("/reports/{id}", get(get_report))
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user))
        .merge(writes)
}
